use anyhow::{Context, Result, anyhow};
use clap::Parser;
use odc::config::SERVICE_URL_VAR;
use odc::http::MAX_RETRIES;
use odc::runtime::RealRuntime;
use odc::{ClientConfig, EnvCredentials, ODataService};
use serde_json::Value;
use std::time::Duration;

/// odc - resilient OData client
///
/// Reads collections (following every @odata.nextLink page) and writes
/// entities on an OData service using HTTP basic authentication.
///
/// Credentials are read from the SAP_USERNAME and SAP_PASSWORD environment
/// variables.
///
/// Examples:
///   odc get Products -p '$top=50'     # All pages of Products, 50 per page
///   odc create Products '{"Name":"x"}'
///   odc delete 'Products(1)'
#[derive(Parser, Debug)]
#[command(author, version = env!("ODC_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the OData service (also via SAP_SERVICE_URL)
    #[arg(
        long = "service-url",
        short = 's',
        env = SERVICE_URL_VAR,
        value_name = "URL",
        global = true
    )]
    service_url: Option<String>,

    /// Timeout for a single request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 10, global = true)]
    timeout: u64,

    /// Retries after a failed attempt
    #[arg(long, value_name = "N", default_value_t = MAX_RETRIES, global = true)]
    retries: usize,

    /// Lifetime of cached responses in seconds (0 disables the cache)
    #[arg(long = "cache-ttl", value_name = "SECS", default_value_t = 300, global = true)]
    cache_ttl: u64,

    /// Give up on collections with more pages than this
    #[arg(long = "max-pages", value_name = "N", default_value_t = 1000, global = true)]
    max_pages: usize,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Read a collection, merging all pages
    Get(GetArgs),

    /// Create an entity (POST)
    Create(BodyArgs),

    /// Replace an entity (PUT)
    Update(BodyArgs),

    /// Delete an entity
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// Endpoint relative to the service URL, e.g. "Products"
    #[arg(value_name = "ENDPOINT")]
    endpoint: String,

    /// Query parameter, repeatable
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

#[derive(clap::Args, Debug)]
struct BodyArgs {
    #[arg(value_name = "ENDPOINT")]
    endpoint: String,

    /// JSON request body
    #[arg(value_name = "JSON", value_parser = parse_json)]
    body: Value,
}

#[derive(clap::Args, Debug)]
struct DeleteArgs {
    #[arg(value_name = "ENDPOINT")]
    endpoint: String,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {}", e))
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        let service_url = self.service_url.clone().ok_or_else(|| {
            anyhow!(
                "No service URL given. Use --service-url or set {}.",
                SERVICE_URL_VAR
            )
        })?;

        Ok(ClientConfig::new(service_url)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_retries(self.retries)
            .with_cache_ttl(Duration::from_secs(self.cache_ttl))
            .with_max_pages(self.max_pages))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = cli.client_config()?;

    let service = ODataService::new(config, &EnvCredentials::new(RealRuntime)).await?;
    let result = run(&service, cli.command).await;
    service.close()?;

    let output = result?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to format response")?
    );
    Ok(())
}

async fn run(service: &ODataService, command: Commands) -> Result<Value> {
    let (endpoint, result) = match command {
        Commands::Get(args) => {
            let params: Vec<(&str, &str)> = args
                .params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let data = service.get_data(&args.endpoint, &params).await?;
            return Ok(data);
        }
        Commands::Create(args) => {
            let result = service.create_data(&args.endpoint, &args.body).await?;
            (args.endpoint, result)
        }
        Commands::Update(args) => {
            let result = service.update_data(&args.endpoint, &args.body).await?;
            (args.endpoint, result)
        }
        Commands::Delete(args) => {
            let result = service.delete_data(&args.endpoint).await?;
            (args.endpoint, result)
        }
    };

    result.ok_or_else(|| anyhow!("Request to {} failed after exhausting retries", endpoint))
}
