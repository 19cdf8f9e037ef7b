//! Errors surfaced to callers of the bridge.
//!
//! Application errors reported by the surface are NOT in here: they travel
//! inside [`framebridge_protocol::JsonRpcResponse::error`] and the call still
//! succeeds at the protocol level.

use std::time::Duration;

use framebridge_protocol::CorrelationId;

use crate::ports::TransportError;

/// Error code reported for [`BridgeError::NotReady`].
pub const NOT_READY_CODE: &str = "MODAL_NOT_READY";

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The surface has not signalled readiness and the policy is fail-fast.
    /// Callers are expected to retry later.
    #[error("Modal is not ready.")]
    NotReady,

    /// The transport rejected the outbound envelope.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The pending call was dropped before resolving (bridge closed).
    #[error("Request was cancelled")]
    Cancelled,

    /// Only produced by `post_with_timeout`.
    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    /// Two members of one batch share a correlation id.
    #[error("Duplicate correlation id in batch: {0}")]
    DuplicateId(CorrelationId),

    /// Inbound text was not a valid message.
    #[error("Failed to decode inbound message: {0}")]
    Decode(#[from] serde_json::Error),

    /// A typed helper got a reply of the other shape.
    #[error("Expected a {expected} reply")]
    ReplyShape { expected: &'static str },
}

impl BridgeError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::NotReady => NOT_READY_CODE,
            BridgeError::Transport(_) => "TRANSPORT_FAILED",
            BridgeError::Cancelled => "CANCELLED",
            BridgeError::Timeout { .. } => "TIMEOUT",
            BridgeError::DuplicateId(_) => "DUPLICATE_ID",
            BridgeError::Decode(_) => "DECODE_FAILED",
            BridgeError::ReplyShape { .. } => "REPLY_SHAPE",
        }
    }

    pub fn is_not_ready(&self) -> bool {
        matches!(self, BridgeError::NotReady)
    }
}
