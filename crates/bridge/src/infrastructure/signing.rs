//! Signer adapters.

use async_trait::async_trait;

use crate::ports::{SigningError, TokenSigner};

/// Signer for hosts without a signing capability. Always fails, so requests
/// go out with only a stored `jwt`, if any.
#[derive(Debug, Clone, Default)]
pub struct UnavailableSigner;

#[async_trait]
impl TokenSigner for UnavailableSigner {
    async fn create_token(&self) -> Result<String, SigningError> {
        Err(SigningError::Unavailable(
            "no signing key on this host".to_string(),
        ))
    }
}

/// Signer returning a fixed token.
#[derive(Debug, Clone)]
pub struct StaticSigner {
    token: String,
}

impl StaticSigner {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSigner for StaticSigner {
    async fn create_token(&self) -> Result<String, SigningError> {
        Ok(self.token.clone())
    }
}
