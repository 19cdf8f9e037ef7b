//! Framebridge Protocol - wire types shared by the host bridge and the embedded surface
//!
//! This crate contains all types that cross the message channel:
//! - JSON-RPC request payloads (single and batch)
//! - Standardized JSON-RPC responses
//! - Outbound envelopes and inbound messages with their channel keys
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde and serde_json
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Wire names are camelCase** - matching what the surface emits

pub mod ids;
pub mod messages;
pub mod requests;
pub mod responses;

pub use ids::CorrelationId;
pub use messages::{
    channel_key, InboundMessage, IncomingMessage, OutboundEnvelope, OutgoingMessage, RawResponse,
};
pub use requests::{Payload, RequestPayload, JSONRPC_VERSION};
pub use responses::{JsonRpcError, JsonRpcResponse, Reply, INTERNAL_ERROR_CODE};
