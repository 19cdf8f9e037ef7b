//! Response Standardizer.
//!
//! Turns a raw inbound message into a typed [`JsonRpcResponse`] for the request
//! it answers. Messages without an id, or whose id matches no request of the
//! given payload, produce nothing: they may belong to another call sharing the
//! same channel.

use framebridge_protocol::{
    CorrelationId, InboundMessage, JsonRpcError, JsonRpcResponse, Payload, RequestPayload,
};

/// A response matched to its originating request.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedResponse {
    /// Position of the originating request in the payload (0 for a single request)
    pub index: usize,
    pub id: CorrelationId,
    pub response: JsonRpcResponse,
}

/// Find the request with `id` in `payload`.
///
/// Linear scan; batches hold tens of requests, not thousands.
pub(crate) fn find_request<'a>(
    payload: &'a Payload,
    id: &CorrelationId,
) -> Option<(usize, &'a RequestPayload)> {
    match payload {
        Payload::Single(request) => (request.id == *id).then_some((0, request)),
        Payload::Batch(requests) => requests.iter().enumerate().find(|(_, r)| r.id == *id),
    }
}

/// Match `message` against `payload` and build the typed response.
pub fn standardize(payload: &Payload, message: &InboundMessage) -> Option<StandardizedResponse> {
    let raw = message.response.as_ref()?;
    let id = raw.id.as_ref()?;
    let (index, request) = find_request(payload, id)?;

    let response = JsonRpcResponse::for_request(request)
        .apply_result(raw.result.clone())
        .apply_error(raw.error.as_ref().map(JsonRpcError::from_wire));

    Some(StandardizedResponse {
        index,
        id: id.clone(),
        response,
    })
}
