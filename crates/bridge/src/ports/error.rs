//! Error types for port operations.

/// Transport failures. A failed send aborts the call that issued it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// `send` was called before `init`.
    #[error("Transport not initialized")]
    NotInitialized,

    /// The host channel rejected the message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The receiving side of the channel is gone.
    #[error("Transport channel closed")]
    Closed,
}

impl TransportError {
    pub fn send_failed(message: impl ToString) -> Self {
        Self::SendFailed(message.to_string())
    }
}

/// Storage failures. Never fatal for a request.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation failed - includes operation name for tracing.
    #[error("Storage I/O error in {operation}: {message}")]
    Io {
        operation: &'static str,
        message: String,
    },

    /// Stored data could not be (de)serialized.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn io(operation: &'static str, message: impl ToString) -> Self {
        Self::Io {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Signing failures. Logged, and the request proceeds without an auth token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    /// This host has no signing capability.
    #[error("Signing unavailable: {0}")]
    Unavailable(String),

    /// Signing was attempted and failed.
    #[error("Signing failed: {0}")]
    Failed(String),
}
