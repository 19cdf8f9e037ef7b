//! Framebridge - host-side bridge to an embedded wallet surface.
//!
//! The host talks to a sandboxed surface (iframe, webview) over an
//! asynchronous, unordered message channel. This crate turns that channel
//! into request/response calls:
//!
//! - **Readiness gate**: requests wait (or fail fast) until the surface
//!   announces `OVERLAY_READY`
//! - **Correlation**: JSON-RPC responses are matched to requests by id,
//!   batches resolve in request order
//! - **Side effects**: overlay show/hide and refresh-token persistence run
//!   alongside call resolution
//!
//! # Architecture
//!
//! ```text
//! caller --post--> Bridge --envelope--> Transport ----> surface
//!                    ^                                     |
//!                    +--dispatch-- spawn_inbound_loop <----+
//! ```
//!
//! Collaborators sit behind the traits in [`ports`]; [`infrastructure`] has
//! in-process implementations.

pub mod config;
pub mod controller;
pub mod error;
pub mod infrastructure;
pub mod messaging;
pub mod ports;
pub mod tokens;

pub use config::{BridgeConfig, HostEnvironment};
pub use controller::Bridge;
pub use error::{BridgeError, NOT_READY_CODE};
pub use messaging::{ReadinessPolicy, Subscription};
pub use tokens::TokenStore;

pub use framebridge_protocol as protocol;
