//! Token signing port.

use async_trait::async_trait;

use super::error::SigningError;

/// Produces a signed auth token on demand.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSigner: Send + Sync {
    async fn create_token(&self) -> Result<String, SigningError>;
}
