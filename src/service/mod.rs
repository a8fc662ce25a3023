//! Client session for one OData service.

mod pager;

use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::auth::{CredentialProvider, basic_auth_header};
use crate::config::ClientConfig;
use crate::error::ODataError;
use crate::http::{Executor, Request};

pub use pager::{DEFAULT_MAX_PAGES, NEXT_LINK, Page, Pager, VALUE};

/// Authenticated session against one service endpoint.
///
/// Owns the transport together with its response cache and rate-limit
/// state; nothing is shared between sessions. The session can be shared
/// between tasks behind an `Arc`.
///
/// [`close`](Self::close) releases the transport. Any later call fails with
/// [`ODataError::Closed`]. Calls already in flight finish on the transport
/// they started with. Dropping the session releases the transport as well.
pub struct ODataService {
    config: ClientConfig,
    executor: RwLock<Option<Arc<Executor>>>,
}

impl ODataService {
    /// Builds a session, resolving credentials once. No request is sent.
    #[tracing::instrument(skip(config, credentials), fields(service_url = %config.service_url))]
    pub async fn new<P>(config: ClientConfig, credentials: &P) -> Result<Self, ODataError>
    where
        P: CredentialProvider + ?Sized,
    {
        Url::parse(&config.service_url).map_err(|e| {
            ODataError::Config(format!(
                "Invalid service URL '{}': {}",
                config.service_url, e
            ))
        })?;

        let credentials = credentials.credentials().await?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, basic_auth_header(&credentials)?);
        debug!(
            "Using basic authentication for {} as {}",
            config.service_url, credentials.username
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| ODataError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let executor = Executor::new(client, &config);
        Ok(Self {
            config,
            executor: RwLock::new(Some(Arc::new(executor))),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.executor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn executor(&self) -> Result<Arc<Executor>, ODataError> {
        self.executor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ODataError::Closed)
    }

    /// Time left before the server accepts requests again.
    pub fn rate_limit_remaining(&self) -> Result<Duration, ODataError> {
        Ok(self.executor()?.gate().remaining())
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) -> Result<(), ODataError> {
        self.executor()?.cache().clear();
        Ok(())
    }

    /// Reads a collection, following every `@odata.nextLink` and merging the
    /// pages into one `{"value": [...]}` object.
    #[tracing::instrument(skip(self, params))]
    pub async fn get_data(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ODataError> {
        let request =
            Request::get(self.config.endpoint_url(endpoint)).with_params(params.iter().copied());
        self.fetch_all(request).await
    }

    /// Like [`get_data`](Self::get_data), deserializing the aggregated items.
    #[tracing::instrument(skip(self, params))]
    pub async fn get_items<T>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, ODataError>
    where
        T: DeserializeOwned,
    {
        let items = match self.get_data(endpoint, params).await? {
            Value::Object(mut object) => object.remove(VALUE).unwrap_or_default(),
            _ => Value::Null,
        };
        if items.is_null() {
            return Ok(Vec::new());
        }

        serde_json::from_value(items)
            .map_err(|e| ODataError::data_fetch(self.config.endpoint_url(endpoint), e))
    }

    /// Aggregates every page reachable from `request`.
    pub async fn fetch_all(&self, request: Request) -> Result<Value, ODataError> {
        self.pages(request)?.collect_all().await
    }

    /// Lazy page-by-page access to a collection.
    pub fn pages(&self, request: Request) -> Result<Pager, ODataError> {
        Ok(Pager::new(self.executor()?, request, self.config.max_pages))
    }

    /// POSTs `body` to the endpoint.
    ///
    /// `Ok(None)` means the server kept failing until the retry budget ran
    /// out; the failure has been logged.
    #[tracing::instrument(skip(self, body))]
    pub async fn create_data<B>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Option<Value>, ODataError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.config.endpoint_url(endpoint);
        let body = to_body(&url, body)?;
        self.execute(&Request::post(url, body)).await
    }

    /// PUTs `body` to the endpoint.
    #[tracing::instrument(skip(self, body))]
    pub async fn update_data<B>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Option<Value>, ODataError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.config.endpoint_url(endpoint);
        let body = to_body(&url, body)?;
        self.execute(&Request::put(url, body)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_data(&self, endpoint: &str) -> Result<Option<Value>, ODataError> {
        self.execute(&Request::delete(self.config.endpoint_url(endpoint)))
            .await
    }

    /// Runs a single request through the cache, rate-limit gate and retry
    /// loop without following pagination.
    pub async fn execute(&self, request: &Request) -> Result<Option<Value>, ODataError> {
        self.executor()?.execute(request).await
    }

    /// Releases the transport. Fails if the session was already closed.
    pub fn close(&self) -> Result<(), ODataError> {
        let mut executor = self
            .executor
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match executor.take() {
            Some(_) => {
                debug!("Closed session for {}", self.config.service_url);
                Ok(())
            }
            None => Err(ODataError::Closed),
        }
    }
}

fn to_body<B: Serialize + ?Sized>(url: &str, body: &B) -> Result<Value, ODataError> {
    serde_json::to_value(body).map_err(|e| {
        ODataError::data_fetch(
            url,
            anyhow::Error::from(e).context("Failed to serialize request body"),
        )
    })
}
