//! Port traits for the collaborators around the correlation engine.
//!
//! These are the ONLY abstractions in the bridge. Everything else is concrete types.
//! Ports exist for:
//! - Transport (browser iframe, mobile webview, in-process channel)
//! - Storage (localStorage, file, memory)
//! - Token signing (web crypto, unavailable on some hosts)

mod error;
mod signing;
mod storage;
mod transport;

pub use error::{SigningError, StorageError, TransportError};
pub use signing::TokenSigner;
pub use storage::{storage_keys, Storage};
pub use transport::Transport;

#[cfg(test)]
pub use signing::MockTokenSigner;
#[cfg(test)]
pub use storage::MockStorage;
#[cfg(test)]
pub use transport::MockTransport;
