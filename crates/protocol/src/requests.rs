//! Request payload types for the request/response pattern.
//!
//! A [`Payload`] is either a single JSON-RPC request or an ordered batch of
//! requests sharing one envelope. On the wire it is a plain object or array.

use serde::{Deserialize, Serialize};

use crate::ids::CorrelationId;

/// JSON-RPC protocol version stamped on every request.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

fn default_params() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

// =============================================================================
// Request Payload
// =============================================================================

/// One unit of work sent to the embedded surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    pub id: CorrelationId,
    pub method: String,
    #[serde(default = "default_params")]
    pub params: serde_json::Value,
}

impl RequestPayload {
    /// Create a request with no params.
    pub fn new(id: impl Into<CorrelationId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id: id.into(),
            method: method.into(),
            params: default_params(),
        }
    }

    pub fn with_params(mut self, params: impl Into<serde_json::Value>) -> Self {
        self.params = params.into();
        self
    }
}

// =============================================================================
// Single vs Batch
// =============================================================================

/// A single request or an ordered, fixed-size batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Single(RequestPayload),
    Batch(Vec<RequestPayload>),
}

impl Payload {
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }

    /// Correlation ids this payload expects answers for, in request order.
    pub fn ids(&self) -> Vec<CorrelationId> {
        match self {
            Payload::Single(request) => vec![request.id.clone()],
            Payload::Batch(requests) => requests.iter().map(|r| r.id.clone()).collect(),
        }
    }

    /// Number of responses needed before the call can resolve.
    pub fn len(&self) -> usize {
        match self {
            Payload::Single(_) => 1,
            Payload::Batch(requests) => requests.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RequestPayload> for Payload {
    fn from(request: RequestPayload) -> Self {
        Payload::Single(request)
    }
}

impl From<Vec<RequestPayload>> for Payload {
    fn from(requests: Vec<RequestPayload>) -> Self {
        Payload::Batch(requests)
    }
}
