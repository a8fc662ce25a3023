//! Resilient client for authenticated, paginated OData services.
//!
//! Every call goes through one pipeline: response cache, rate-limit gate,
//! timeout-bounded exchange with fixed-delay retry, and for reads the
//! aggregation of all `@odata.nextLink` pages into one collection.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod runtime;
pub mod service;

pub use auth::{CredentialProvider, Credentials, EnvCredentials};
pub use config::ClientConfig;
pub use error::ODataError;
pub use service::ODataService;
