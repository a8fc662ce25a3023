//! Credentials and the Basic-Auth header derived from them.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use reqwest::header::HeaderValue;
use std::fmt;

use crate::error::ODataError;
use crate::runtime::Runtime;

/// Environment variable holding the service username.
pub const USERNAME_VAR: &str = "SAP_USERNAME";

/// Environment variable holding the service password.
pub const PASSWORD_VAR: &str = "SAP_PASSWORD";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Source of the username/password pair a session authenticates with.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, ODataError>;
}

#[async_trait]
impl CredentialProvider for Credentials {
    async fn credentials(&self) -> Result<Credentials, ODataError> {
        Ok(self.clone())
    }
}

/// Reads credentials from `SAP_USERNAME` and `SAP_PASSWORD`.
pub struct EnvCredentials<R: Runtime> {
    runtime: R,
}

impl<R: Runtime> EnvCredentials<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl<R: Runtime> CredentialProvider for EnvCredentials<R> {
    #[tracing::instrument(skip(self))]
    async fn credentials(&self) -> Result<Credentials, ODataError> {
        let username = self.runtime.env_var(USERNAME_VAR).unwrap_or_default();
        let password = self.runtime.env_var(PASSWORD_VAR).unwrap_or_default();

        if username.is_empty() || password.is_empty() {
            return Err(ODataError::Authentication(format!(
                "Missing {} or {} environment variables.",
                USERNAME_VAR, PASSWORD_VAR
            )));
        }

        debug!("Using credentials from environment for user {}", username);
        Ok(Credentials { username, password })
    }
}

/// Builds `Basic base64(username:password)`, marked sensitive so it never
/// shows up in debug output of the transport.
pub fn basic_auth_header(credentials: &Credentials) -> Result<HeaderValue, ODataError> {
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(ODataError::Authentication(
            "Username and password must not be empty.".to_string(),
        ));
    }

    let encoded = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
    let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|e| ODataError::Authentication(format!("Invalid credentials: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    fn runtime_with(username: Option<&str>, password: Option<&str>) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        let username = username.map(str::to_string);
        let password = password.map(str::to_string);

        runtime
            .expect_env_var()
            .with(eq(USERNAME_VAR))
            .returning(move |_| username.clone().ok_or(std::env::VarError::NotPresent));
        runtime
            .expect_env_var()
            .with(eq(PASSWORD_VAR))
            .returning(move |_| password.clone().ok_or(std::env::VarError::NotPresent));

        runtime
    }

    #[test]
    fn test_basic_auth_header_encoding() {
        let header = basic_auth_header(&Credentials::new("Aladdin", "open sesame")).unwrap();
        assert_eq!(header.to_str().unwrap(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_basic_auth_header_is_deterministic() {
        let creds = Credentials::new("user", "pass");
        assert_eq!(
            basic_auth_header(&creds).unwrap(),
            basic_auth_header(&creds).unwrap()
        );
    }

    #[test]
    fn test_basic_auth_header_rejects_empty_credentials() {
        for creds in [
            Credentials::new("", "pass"),
            Credentials::new("user", ""),
            Credentials::new("", ""),
        ] {
            let result = basic_auth_header(&creds);
            assert!(matches!(result, Err(ODataError::Authentication(_))));
        }
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let output = format!("{:?}", Credentials::new("user", "hunter2"));
        assert!(output.contains("user"));
        assert!(!output.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_env_credentials_present() {
        let provider = EnvCredentials::new(runtime_with(Some("alice"), Some("secret")));
        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds, Credentials::new("alice", "secret"));
    }

    #[tokio::test]
    async fn test_env_credentials_missing_password() {
        let provider = EnvCredentials::new(runtime_with(Some("alice"), None));
        let err = provider.credentials().await.unwrap_err();
        assert!(matches!(err, ODataError::Authentication(_)));
        assert!(err.to_string().contains(PASSWORD_VAR));
    }

    #[tokio::test]
    async fn test_env_credentials_empty_username() {
        let provider = EnvCredentials::new(runtime_with(Some(""), Some("secret")));
        let result = provider.credentials().await;
        assert!(matches!(result, Err(ODataError::Authentication(_))));
    }
}
