//! Connection registry
//!
//! Tracks every live connection by [`ClientId`] together with the handle used to
//! push frames to it. The registry has its own lock, independent of the
//! document's; the two are never held at the same time.

pub mod handle;
pub mod id;
pub mod store;

pub use handle::{ChannelHandle, ClientHandle, SendError, DEFAULT_OUTBOUND_CAPACITY};
pub use id::ClientId;
pub use store::{ConnectionRegistry, RegistrySnapshot};
