//! Infrastructure adapters for the port traits, plus the inbound task.

pub mod channel_transport;
pub mod inbound;
pub mod loopback;
pub mod signing;
pub mod storage;

pub use channel_transport::ChannelTransport;
pub use inbound::spawn_inbound_loop;
pub use loopback::LoopbackSurface;
pub use signing::{StaticSigner, UnavailableSigner};
pub use storage::{FileStorage, MemoryStorage};
