//! Response types for the request/response pattern.
//!
//! A [`JsonRpcResponse`] is always built from the request it answers, so the
//! `jsonrpc` version and `id` mirror the originating payload rather than
//! whatever the embedded surface put on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::CorrelationId;
use crate::requests::RequestPayload;

// =============================================================================
// Error Object
// =============================================================================

/// Code used when the surface sends an error without a usable numeric code.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// JSON-RPC error object carried in a response's `error` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Build from whatever the surface put in a response's `error` slot.
    ///
    /// Never fails. Integer, float and numeric-string codes are accepted; a
    /// missing code becomes [`INTERNAL_ERROR_CODE`]. A bare string is taken as
    /// the message. Any other non-object value is kept as `data`.
    pub fn from_wire(value: &Value) -> Self {
        match value {
            Value::Object(fields) => {
                let code = fields
                    .get("code")
                    .and_then(parse_code)
                    .unwrap_or(INTERNAL_ERROR_CODE);
                let message = match fields.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    Some(Value::Null) | None => UNKNOWN_ERROR_MESSAGE.to_string(),
                    Some(other) => other.to_string(),
                };
                Self {
                    code,
                    message,
                    data: fields.get("data").filter(|d| !d.is_null()).cloned(),
                }
            }
            Value::String(message) => Self::new(INTERNAL_ERROR_CODE, message.clone()),
            other => Self::new(INTERNAL_ERROR_CODE, UNKNOWN_ERROR_MESSAGE).with_data(other.clone()),
        }
    }

    /// Wire form, as the surface would send it.
    pub fn to_wire(&self) -> Value {
        let mut fields = serde_json::Map::new();
        fields.insert("code".to_string(), Value::from(self.code));
        fields.insert("message".to_string(), Value::from(self.message.clone()));
        if let Some(data) = &self.data {
            fields.insert("data".to_string(), data.clone());
        }
        Value::Object(fields)
    }
}

fn parse_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

// =============================================================================
// Standardized Response
// =============================================================================

/// Typed response to one request. Carries a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Start an empty response for `request`.
    pub fn for_request(request: &RequestPayload) -> Self {
        Self {
            jsonrpc: request.jsonrpc.clone(),
            id: request.id.clone(),
            result: None,
            error: None,
        }
    }

    /// Apply a result. Ignored when absent or when an error is already set.
    pub fn apply_result(mut self, result: Option<serde_json::Value>) -> Self {
        if self.error.is_none() {
            if let Some(result) = result {
                self.result = Some(result);
            }
        }
        self
    }

    /// Apply an error. An applied error clears any previous result.
    pub fn apply_error(mut self, error: Option<JsonRpcError>) -> Self {
        if let Some(error) = error {
            self.result = None;
            self.error = Some(error);
        }
        self
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&JsonRpcError> {
        self.error.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Convert into a `Result`, treating a missing result as JSON `null`.
    pub fn into_result(self) -> Result<serde_json::Value, JsonRpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}

// =============================================================================
// Reply
// =============================================================================

/// Resolved value of a call, mirroring the shape of the request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

impl Reply {
    pub fn into_single(self) -> Option<JsonRpcResponse> {
        match self {
            Reply::Single(response) => Some(response),
            Reply::Batch(_) => None,
        }
    }

    pub fn into_batch(self) -> Option<Vec<JsonRpcResponse>> {
        match self {
            Reply::Batch(responses) => Some(responses),
            Reply::Single(_) => None,
        }
    }
}
