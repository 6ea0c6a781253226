//! Caller authentication for the job submission and status update endpoints.

mod api_key;
mod open;

use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use api_key::ApiKeyAuthenticator;
pub use open::OpenAuthenticator;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("API key required")]
    MissingKey,

    #[error("Invalid API key")]
    InvalidKey,

    #[error("Authentication misconfigured: {0}")]
    Misconfigured(String),
}

/// Credentials presented with a request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Value of the `x-api-key` header.
    pub api_key: Option<String>,
    /// Token of an `Authorization: Bearer` header.
    pub bearer: Option<String>,
    pub source_ip: Option<IpAddr>,
}

impl Credentials {
    /// Collect credentials from header name/value pairs. Names match case-insensitively.
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut credentials = Self::default();
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("x-api-key") {
                credentials.api_key = Some(value.trim().to_string());
            } else if name.eq_ignore_ascii_case("authorization") {
                let value = value.trim();
                let is_bearer = value
                    .get(..7)
                    .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer "));
                if is_bearer {
                    credentials.bearer = Some(value[7..].trim().to_string());
                }
            }
        }
        credentials
    }

    pub fn with_source_ip(mut self, ip: IpAddr) -> Self {
        self.source_ip = Some(ip);
        self
    }

    /// The key to check; `x-api-key` wins over a bearer token.
    pub fn presented_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .or(self.bearer.as_deref())
            .filter(|k| !k.is_empty())
    }
}

/// Who made an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub method: AuthMethod,
    pub subject: String,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            method: AuthMethod::None,
            subject: "anonymous".to_string(),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Caller, AuthError>;

    fn method(&self) -> AuthMethod;
}

/// Build the authenticator selected by the config.
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(OpenAuthenticator)),
        AuthMethod::ApiKey => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AuthError::Misconfigured("auth.api_key is not set".to_string()))?;
            Ok(Box::new(ApiKeyAuthenticator::new(key)))
        }
    }
}
