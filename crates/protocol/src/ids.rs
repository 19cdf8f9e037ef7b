//! Correlation identifiers linking a request to its eventual response.
//!
//! JSON-RPC allows either a string or a number as the request id, and the
//! embedded surface echoes back whatever it received. The id is supplied by
//! the caller and must be unique among concurrently outstanding requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A JSON-RPC correlation id (string or number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrelationId {
    Number(i64),
    Str(String),
}

impl CorrelationId {
    /// Borrow the id as a string when it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CorrelationId::Str(s) => Some(s.as_str()),
            CorrelationId::Number(_) => None,
        }
    }

    /// Get the id as a number when it is one.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            CorrelationId::Number(n) => Some(*n),
            CorrelationId::Str(_) => None,
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationId::Number(n) => write!(f, "{}", n),
            CorrelationId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        CorrelationId::Str(value.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        CorrelationId::Str(value)
    }
}

impl From<i64> for CorrelationId {
    fn from(value: i64) -> Self {
        CorrelationId::Number(value)
    }
}

impl From<u32> for CorrelationId {
    fn from(value: u32) -> Self {
        CorrelationId::Number(i64::from(value))
    }
}
