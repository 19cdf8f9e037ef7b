//! Readiness Gate.
//!
//! One-shot state machine that holds outbound traffic until the embedded
//! surface announces it finished booting. `NotReady -> Ready` is the only
//! transition; later ready signals are no-ops.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// What a caller does when the gate is still closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessPolicy {
    /// Suspend until the surface is ready. For hosts with a reliable boot signal.
    Suspend,
    /// Fail immediately with a not-ready error. For hosts where the boot signal
    /// may never arrive (e.g. launched offline); callers retry later.
    FailFast,
}

/// Shared handle to the gate. Clones observe the same state.
#[derive(Clone)]
pub struct ReadinessGate {
    state: Arc<watch::Sender<bool>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Open the gate. Returns true only for the call that performed the transition.
    pub fn mark_ready(&self) -> bool {
        let was_ready = self.state.send_replace(true);
        !was_ready
    }

    pub fn is_ready(&self) -> bool {
        *self.state.borrow()
    }

    /// Wait until the gate is open. Returns immediately once it is.
    pub async fn wait_ready(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}
