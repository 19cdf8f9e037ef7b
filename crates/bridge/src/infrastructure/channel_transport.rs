//! In-process transport over a tokio mpsc channel.
//!
//! The receiving half stands in for the embedded surface: whoever owns it
//! sees every outbound envelope in send order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use framebridge_protocol::OutboundEnvelope;
use tokio::sync::mpsc;

use crate::ports::{Transport, TransportError};

#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<OutboundEnvelope>,
    initialized: Arc<AtomicBool>,
    overlay_visible: Arc<AtomicBool>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<OutboundEnvelope>) -> Self {
        Self {
            tx,
            initialized: Arc::new(AtomicBool::new(false)),
            overlay_visible: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a transport and the receiver the surface side reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub fn is_overlay_visible(&self) -> bool {
        self.overlay_visible.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn init(&self) -> Result<(), TransportError> {
        if self.tx.is_closed() {
            return Err(TransportError::Closed);
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, envelope: OutboundEnvelope) -> Result<(), TransportError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(TransportError::NotInitialized);
        }

        self.tx
            .send(envelope)
            .await
            .map_err(|_| TransportError::Closed)
    }

    fn hide_overlay(&self) {
        self.overlay_visible.store(false, Ordering::SeqCst);
        tracing::debug!("Overlay hidden");
    }

    fn show_overlay(&self) {
        self.overlay_visible.store(true, Ordering::SeqCst);
        tracing::debug!("Overlay shown");
    }
}
