//! Message correlation building blocks.
//!
//! - `registry`: channel-key subscriptions with re-entrant dispatch
//! - `gate`: one-shot readiness gate
//! - `standardize`: match raw responses to their originating requests
//! - `pending`: per-call response accumulation
//!
//! The [`crate::Bridge`] composes these into the request/response engine.

pub mod gate;
pub mod pending;
pub mod registry;
pub mod standardize;

pub use gate::{ReadinessGate, ReadinessPolicy};
pub use pending::{PendingCall, Progress};
pub use registry::{Subscription, SubscriptionRegistry};
pub use standardize::{standardize, StandardizedResponse};
