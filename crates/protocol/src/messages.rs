//! Message envelopes exchanged with the embedded surface.
//!
//! Every message carries a `channelKey` of the form
//! `"<MESSAGE_TYPE>-<instanceSuffix>"`. The suffix is unique per bridge
//! instance so several bridges to different surfaces never cross-deliver.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::CorrelationId;
use crate::requests::Payload;
use crate::responses::JsonRpcError;

// =============================================================================
// Message Types
// =============================================================================

/// Message types sent from the host to the embedded surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutgoingMessage {
    /// JSON-RPC request (single or batch)
    HandleRequest,
}

impl OutgoingMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutgoingMessage::HandleRequest => "HANDLE_REQUEST",
        }
    }
}

/// Message types sent from the embedded surface to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingMessage {
    /// Response to a previously posted request
    HandleResponse,
    /// The surface finished booting and accepts requests
    OverlayReady,
    /// The surface wants to be shown
    ShowOverlay,
    /// The surface wants to be hidden
    HideOverlay,
    /// Uncorrelated event emitted by the surface
    HandleEvent,
}

impl IncomingMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomingMessage::HandleResponse => "HANDLE_RESPONSE",
            IncomingMessage::OverlayReady => "OVERLAY_READY",
            IncomingMessage::ShowOverlay => "SHOW_OVERLAY",
            IncomingMessage::HideOverlay => "HIDE_OVERLAY",
            IncomingMessage::HandleEvent => "HANDLE_EVENT",
        }
    }
}

impl fmt::Display for OutgoingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IncomingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the scoped channel key for a message type and bridge instance.
pub fn channel_key(message_type: impl fmt::Display, instance_suffix: &str) -> String {
    format!("{}-{}", message_type, instance_suffix)
}

// =============================================================================
// Outbound Envelope (Host → Surface)
// =============================================================================

/// Envelope wrapping a request payload on its way to the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEnvelope {
    pub channel_key: String,
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl OutboundEnvelope {
    pub fn new(channel_key: impl Into<String>, payload: Payload) -> Self {
        Self {
            channel_key: channel_key.into(),
            payload,
            auth_token: None,
            refresh_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_refresh_token(mut self, token: Option<String>) -> Self {
        self.refresh_token = token;
        self
    }
}

// =============================================================================
// Inbound Message (Surface → Host)
// =============================================================================

/// Raw response body as sent by the surface, before standardization.
///
/// `error` stays untyped here: a loosely shaped error must not make the whole
/// message undecodable. It is typed during standardization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl RawResponse {
    pub fn success(id: impl Into<CorrelationId>, result: serde_json::Value) -> Self {
        Self {
            id: Some(id.into()),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: impl Into<CorrelationId>, error: JsonRpcError) -> Self {
        Self {
            id: Some(id.into()),
            result: None,
            error: Some(error.to_wire()),
        }
    }
}

/// A message received from the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub channel_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RawResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl InboundMessage {
    pub fn new(channel_key: impl Into<String>) -> Self {
        Self {
            channel_key: channel_key.into(),
            response: None,
            refresh_token: None,
        }
    }

    pub fn with_response(mut self, response: RawResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Correlation id of the carried response, if any.
    pub fn response_id(&self) -> Option<&CorrelationId> {
        self.response.as_ref().and_then(|r| r.id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::RequestPayload;
    use serde_json::json;

    #[test]
    fn test_channel_key_format() {
        assert_eq!(
            channel_key(IncomingMessage::OverlayReady, "abc123"),
            "OVERLAY_READY-abc123"
        );
        assert_eq!(
            channel_key(OutgoingMessage::HandleRequest, "x"),
            "HANDLE_REQUEST-x"
        );
    }

    #[test]
    fn test_message_type_wire_names_match_as_str() {
        for ty in [
            IncomingMessage::HandleResponse,
            IncomingMessage::OverlayReady,
            IncomingMessage::ShowOverlay,
            IncomingMessage::HideOverlay,
            IncomingMessage::HandleEvent,
        ] {
            assert_eq!(serde_json::to_value(ty).unwrap(), json!(ty.as_str()));
        }
    }

    #[test]
    fn test_envelope_omits_absent_tokens() {
        let envelope = OutboundEnvelope::new(
            "HANDLE_REQUEST-abc",
            RequestPayload::new("1", "getAccount").into(),
        );
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["channelKey"], json!("HANDLE_REQUEST-abc"));
        assert!(value.get("authToken").is_none());
        assert!(value.get("refreshToken").is_none());
    }

    #[test]
    fn test_envelope_carries_tokens_in_camel_case() {
        let envelope = OutboundEnvelope::new("k", RequestPayload::new(1i64, "m").into())
            .with_auth_token(Some("jwt".into()))
            .with_refresh_token(Some("rt".into()));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["authToken"], json!("jwt"));
        assert_eq!(value["refreshToken"], json!("rt"));
    }

    #[test]
    fn test_inbound_parses_wire_shape() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "channelKey": "HANDLE_RESPONSE-abc",
            "response": { "id": "1", "result": { "address": "0xabc" } },
            "refreshToken": "new-rt"
        }))
        .unwrap();

        assert_eq!(msg.response_id(), Some(&CorrelationId::from("1")));
        assert_eq!(msg.refresh_token.as_deref(), Some("new-rt"));
    }

    #[test]
    fn test_inbound_accepts_loose_error() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "channelKey": "HANDLE_RESPONSE-abc",
            "response": { "id": "1", "error": { "message": "x" } }
        }))
        .unwrap();

        assert_eq!(msg.response_id(), Some(&CorrelationId::from("1")));
        assert_eq!(msg.response.unwrap().error, Some(json!({ "message": "x" })));
    }

    #[test]
    fn test_inbound_null_id_is_absent() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "channelKey": "HANDLE_RESPONSE-abc",
            "response": { "id": null, "result": 1 }
        }))
        .unwrap();

        assert!(msg.response_id().is_none());
    }
}
