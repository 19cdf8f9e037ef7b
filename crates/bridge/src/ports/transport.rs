//! Transport port: the host-environment message channel to the embedded surface.

use async_trait::async_trait;
use framebridge_protocol::OutboundEnvelope;

use super::error::TransportError;

/// Capability interface implemented once per host environment.
///
/// The correlation engine only ever talks to the surface through this trait.
/// Inbound traffic does not flow through it: the host feeds inbound messages
/// to [`crate::Bridge::dispatch`] in arrival order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Prepare the channel (mount the frame, attach listeners, ...).
    async fn init(&self) -> Result<(), TransportError>;

    /// Deliver one envelope. Completes once the host channel accepted it.
    async fn send(&self, envelope: OutboundEnvelope) -> Result<(), TransportError>;

    /// Hide the surface overlay. Fire-and-forget.
    fn hide_overlay(&self);

    /// Show the surface overlay. Fire-and-forget.
    fn show_overlay(&self);
}
