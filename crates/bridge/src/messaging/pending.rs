//! Pending Call tracking for request/response correlation.
//!
//! A [`PendingCall`] belongs to exactly one `post` invocation. It holds one
//! slot per expected correlation id, in request order, and resolves exactly
//! once: when every slot is filled. Arrival order does not matter, and a
//! partially answered batch never resolves early.

use framebridge_protocol::{InboundMessage, JsonRpcResponse, Payload, Reply};
use tokio::sync::oneshot;

use super::standardize::standardize;

/// Outcome of feeding one inbound message to a pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The message does not answer this call (other call, no id, duplicate)
    Ignored,
    /// Accepted; still waiting for more responses
    Accepted { remaining: usize },
    /// Accepted and the call is now resolved
    Resolved,
}

pub struct PendingCall {
    payload: Payload,
    slots: Vec<Option<JsonRpcResponse>>,
    remaining: usize,
    resolver: Option<oneshot::Sender<Reply>>,
}

impl PendingCall {
    pub fn new(payload: Payload, resolver: oneshot::Sender<Reply>) -> Self {
        let expected = payload.len();
        Self {
            payload,
            slots: vec![None; expected],
            remaining: expected,
            resolver: Some(resolver),
        }
    }

    /// Number of responses still missing.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_resolved(&self) -> bool {
        self.resolver.is_none()
    }

    /// Feed one inbound message.
    pub fn accept(&mut self, message: &InboundMessage) -> Progress {
        if self.is_resolved() {
            return Progress::Ignored;
        }

        let Some(standardized) = standardize(&self.payload, message) else {
            return Progress::Ignored;
        };

        let slot = &mut self.slots[standardized.index];
        if slot.is_some() {
            tracing::debug!(
                request_id = %standardized.id,
                "Duplicate response for already answered request - ignoring"
            );
            return Progress::Ignored;
        }

        *slot = Some(standardized.response);
        self.remaining -= 1;

        if self.remaining > 0 {
            return Progress::Accepted {
                remaining: self.remaining,
            };
        }

        self.resolve();
        Progress::Resolved
    }

    fn resolve(&mut self) {
        let Some(resolver) = self.resolver.take() else {
            return;
        };

        let mut responses: Vec<JsonRpcResponse> =
            std::mem::take(&mut self.slots).into_iter().flatten().collect();

        let reply = match self.payload {
            Payload::Single(_) => match responses.pop() {
                Some(response) => Reply::Single(response),
                None => return,
            },
            Payload::Batch(_) => Reply::Batch(responses),
        };

        // Receiver gone means the caller stopped waiting; nothing to do
        let _ = resolver.send(reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framebridge_protocol::{CorrelationId, RawResponse, RequestPayload};
    use serde_json::json;

    fn answer(id: &str, result: serde_json::Value) -> InboundMessage {
        InboundMessage::new("HANDLE_RESPONSE-x").with_response(RawResponse::success(id, result))
    }

    #[test]
    fn test_single_resolves_on_matching_id() {
        let (tx, mut rx) = oneshot::channel();
        let mut call = PendingCall::new(RequestPayload::new("1", "getAccount").into(), tx);

        assert_eq!(call.accept(&answer("9", json!(0))), Progress::Ignored);
        assert!(rx.try_recv().is_err());

        assert_eq!(
            call.accept(&answer("1", json!({ "address": "0xabc" }))),
            Progress::Resolved
        );

        let reply = rx.try_recv().unwrap().into_single().unwrap();
        assert_eq!(reply.result(), Some(&json!({ "address": "0xabc" })));
    }

    #[test]
    fn test_batch_resolves_in_request_order() {
        let (tx, mut rx) = oneshot::channel();
        let payload = Payload::from(vec![
            RequestPayload::new("1", "a"),
            RequestPayload::new("2", "b"),
        ]);
        let mut call = PendingCall::new(payload, tx);

        assert_eq!(
            call.accept(&answer("2", json!("second"))),
            Progress::Accepted { remaining: 1 }
        );
        assert!(rx.try_recv().is_err());

        assert_eq!(call.accept(&answer("1", json!("first"))), Progress::Resolved);

        let batch = rx.try_recv().unwrap().into_batch().unwrap();
        let ids: Vec<CorrelationId> = batch.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![CorrelationId::from("1"), CorrelationId::from("2")]);
        assert_eq!(batch[0].result(), Some(&json!("first")));
    }

    #[test]
    fn test_duplicate_response_does_not_count_twice() {
        let (tx, mut rx) = oneshot::channel();
        let payload = Payload::from(vec![
            RequestPayload::new("1", "a"),
            RequestPayload::new("2", "b"),
        ]);
        let mut call = PendingCall::new(payload, tx);

        call.accept(&answer("1", json!(1)));
        assert_eq!(call.accept(&answer("1", json!(1))), Progress::Ignored);
        assert_eq!(call.remaining(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_no_second_resolution() {
        let (tx, _rx) = oneshot::channel();
        let mut call = PendingCall::new(RequestPayload::new("1", "a").into(), tx);

        assert_eq!(call.accept(&answer("1", json!(1))), Progress::Resolved);
        assert!(call.is_resolved());
        assert_eq!(call.accept(&answer("1", json!(2))), Progress::Ignored);
    }
}
