//! Persistent key-value storage port.

use async_trait::async_trait;

use super::error::StorageError;

/// Persistent storage abstraction (localStorage/file-based)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load a value by key, returns None if not found
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Save a value with the given key
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage key constants
///
/// These define the contract for what keys the bridge reads and writes.
pub mod storage_keys {
    /// Refresh token handed out by the surface
    pub const REFRESH_TOKEN: &str = "rt";
    /// Signed auth token attached to outbound requests
    pub const AUTH_TOKEN: &str = "jwt";
}
