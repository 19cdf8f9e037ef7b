//! Loopback surface: an in-process stand-in for the embedded surface.
//!
//! Announces readiness as soon as it starts, then answers every request
//! envelope addressed to its instance:
//! - the result echoes `{ "method": ..., "params": ... }`
//! - method `loopback_fail` gets a JSON-RPC error instead
//! - batch members are answered in reverse order, one message each
//! - every response message carries a fresh refresh token `rt-<n>`

use std::sync::atomic::{AtomicU64, Ordering};

use framebridge_protocol::{
    channel_key, InboundMessage, IncomingMessage, JsonRpcError, OutboundEnvelope, OutgoingMessage,
    Payload, RawResponse, RequestPayload,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Method name that makes the loopback surface answer with an error.
pub const FAIL_METHOD: &str = "loopback_fail";

pub struct LoopbackSurface {
    instance: String,
    inbound: mpsc::Sender<InboundMessage>,
    issued_tokens: AtomicU64,
}

impl LoopbackSurface {
    pub fn new(instance: impl Into<String>, inbound: mpsc::Sender<InboundMessage>) -> Self {
        Self {
            instance: instance.into(),
            inbound,
            issued_tokens: AtomicU64::new(0),
        }
    }

    /// Run the surface on its own task until either channel closes.
    pub fn spawn(self, requests: mpsc::Receiver<OutboundEnvelope>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(requests).await })
    }

    async fn run(self, mut requests: mpsc::Receiver<OutboundEnvelope>) {
        let ready = InboundMessage::new(channel_key(IncomingMessage::OverlayReady, &self.instance));
        if self.inbound.send(ready).await.is_err() {
            return;
        }
        tracing::info!(instance = %self.instance, "Loopback surface ready");

        while let Some(envelope) = requests.recv().await {
            if !self.answer(envelope).await {
                break;
            }
        }

        tracing::info!(instance = %self.instance, "Loopback surface stopped");
    }

    /// Returns false once the host side is gone.
    async fn answer(&self, envelope: OutboundEnvelope) -> bool {
        let expected = channel_key(OutgoingMessage::HandleRequest, &self.instance);
        if envelope.channel_key != expected {
            tracing::warn!(
                channel_key = %envelope.channel_key,
                "Loopback surface ignoring envelope for another channel"
            );
            return true;
        }

        let requests: Vec<RequestPayload> = match envelope.payload {
            Payload::Single(request) => vec![request],
            Payload::Batch(mut requests) => {
                requests.reverse();
                requests
            }
        };

        for request in &requests {
            if self.inbound.send(self.respond(request)).await.is_err() {
                return false;
            }
        }
        true
    }

    fn respond(&self, request: &RequestPayload) -> InboundMessage {
        let raw = if request.method == FAIL_METHOD {
            RawResponse::failure(
                request.id.clone(),
                JsonRpcError::new(-32000, "loopback failure"),
            )
        } else {
            RawResponse::success(
                request.id.clone(),
                json!({ "method": request.method, "params": request.params }),
            )
        };

        let n = self.issued_tokens.fetch_add(1, Ordering::SeqCst) + 1;

        InboundMessage::new(channel_key(IncomingMessage::HandleResponse, &self.instance))
            .with_response(raw)
            .with_refresh_token(format!("rt-{}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_announces_ready_then_answers_in_reverse() {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
        let (request_tx, request_rx) = mpsc::channel(8);
        LoopbackSurface::new("abc", inbound_tx).spawn(request_rx);

        assert_eq!(inbound_rx.recv().await.unwrap().channel_key, "OVERLAY_READY-abc");

        request_tx
            .send(OutboundEnvelope::new(
                "HANDLE_REQUEST-abc",
                Payload::from(vec![
                    RequestPayload::new("1", "a"),
                    RequestPayload::new("2", FAIL_METHOD),
                ]),
            ))
            .await
            .unwrap();

        let first = inbound_rx.recv().await.unwrap();
        assert_eq!(first.channel_key, "HANDLE_RESPONSE-abc");
        assert_eq!(first.response_id().map(|id| id.to_string()), Some("2".into()));
        assert!(first.response.as_ref().unwrap().error.is_some());
        assert_eq!(first.refresh_token.as_deref(), Some("rt-1"));

        let second = inbound_rx.recv().await.unwrap();
        assert_eq!(second.response_id().map(|id| id.to_string()), Some("1".into()));
        assert_eq!(
            second.response.unwrap().result,
            Some(json!({ "method": "a", "params": [] }))
        );
    }

    #[tokio::test]
    async fn test_ignores_other_instances() {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
        let (request_tx, request_rx) = mpsc::channel(8);
        LoopbackSurface::new("abc", inbound_tx).spawn(request_rx);
        inbound_rx.recv().await.unwrap();

        request_tx
            .send(OutboundEnvelope::new(
                "HANDLE_REQUEST-other",
                RequestPayload::new("1", "a").into(),
            ))
            .await
            .unwrap();
        drop(request_tx);

        // Surface stops without answering
        assert!(inbound_rx.recv().await.is_none());
    }
}
