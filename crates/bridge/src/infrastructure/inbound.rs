//! Inbound dispatch loop.

use framebridge_protocol::InboundMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::Bridge;

/// Feed every message from `inbound` to `bridge`, one at a time, in arrival
/// order. The task ends when all senders are dropped.
pub fn spawn_inbound_loop(bridge: Bridge, mut inbound: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = inbound.recv().await {
            bridge.dispatch(&message).await;
        }
        tracing::info!(instance = %bridge.instance(), "Inbound channel closed");
    })
}
