//! Shared-secret authentication.

use async_trait::async_trait;

use super::{AuthError, Authenticator, Caller, Credentials};
use crate::config::AuthMethod;

/// Checks the presented key against one configured secret.
pub struct ApiKeyAuthenticator {
    key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(key: String) -> Self {
        Self { key }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Caller, AuthError> {
        let presented = credentials.presented_key().ok_or(AuthError::MissingKey)?;

        if !keys_match(presented.as_bytes(), self.key.as_bytes()) {
            return Err(AuthError::InvalidKey);
        }

        Ok(Caller {
            method: AuthMethod::ApiKey,
            subject: "api_key".to_string(),
        })
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::ApiKey
    }
}

/// Comparison whose running time depends only on the lengths.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    let diff = presented
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    diff == 0 && presented.len() == expected.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> ApiKeyAuthenticator {
        ApiKeyAuthenticator::new("roster-key".to_string())
    }

    #[tokio::test]
    async fn test_x_api_key_accepted() {
        let credentials = Credentials::from_headers([("x-api-key", "roster-key")]);
        let caller = auth().authenticate(&credentials).await.unwrap();
        assert_eq!(caller.method, AuthMethod::ApiKey);
    }

    #[tokio::test]
    async fn test_bearer_accepted() {
        let credentials = Credentials::from_headers([("Authorization", "Bearer roster-key")]);
        assert!(auth().authenticate(&credentials).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_key() {
        let credentials = Credentials::from_headers([("x-api-key", "roster-kez")]);
        assert!(matches!(
            auth().authenticate(&credentials).await,
            Err(AuthError::InvalidKey)
        ));
    }

    #[tokio::test]
    async fn test_missing_key() {
        assert!(matches!(
            auth().authenticate(&Credentials::default()).await,
            Err(AuthError::MissingKey)
        ));
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"abc", b"abc"));
        assert!(!keys_match(b"abc", b"abd"));
        assert!(!keys_match(b"abc", b"abcd"));
        assert!(!keys_match(b"", b"a"));
    }
}
