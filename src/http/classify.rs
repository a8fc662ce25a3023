//! Diagnostic classification of failed responses.

use log::{debug, error};
use reqwest::StatusCode;
use std::fmt;

/// Category of a non-successful HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    InternalServerError,
    Other(u16),
}

impl From<StatusCode> for StatusClass {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => StatusClass::BadRequest,
            StatusCode::UNAUTHORIZED => StatusClass::Unauthorized,
            StatusCode::FORBIDDEN => StatusClass::Forbidden,
            StatusCode::NOT_FOUND => StatusClass::NotFound,
            StatusCode::INTERNAL_SERVER_ERROR => StatusClass::InternalServerError,
            other => StatusClass::Other(other.as_u16()),
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusClass::BadRequest => write!(f, "Bad Request - Missing parameters."),
            StatusClass::Unauthorized => write!(f, "Unauthorized - Authentication failed."),
            StatusClass::Forbidden => write!(f, "Forbidden - User does not have access."),
            StatusClass::NotFound => write!(f, "Not Found - Resource not found."),
            StatusClass::InternalServerError => write!(f, "Internal Server Error."),
            StatusClass::Other(code) => write!(f, "HTTP Error {}.", code),
        }
    }
}

/// Logs the classified status and the raw body. Never fails; the caller
/// decides what the failure means.
pub fn classify(url: &str, status: StatusCode, body: &str) -> StatusClass {
    let class = StatusClass::from(status);
    error!("{} ({})", class, url);
    debug!("Response body from {}: {}", url, body);
    class
}
