use async_trait::async_trait;

use super::{AuthError, Authenticator, Caller, Credentials};
use crate::config::AuthMethod;

/// Lets every request through as anonymous.
/// Only used when `auth.method = "none"` is set explicitly.
#[derive(Debug, Default)]
pub struct OpenAuthenticator;

#[async_trait]
impl Authenticator for OpenAuthenticator {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<Caller, AuthError> {
        Ok(Caller::anonymous())
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::None
    }
}
