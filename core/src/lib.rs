//! NexusClip Core - LAN clipboard sync library
//!
//! This library provides the core functionality for syncing clipboard text
//! across devices on a local network over unauthenticated UDP broadcast:
//! peer discovery, the wire protocol, and the three daemon loops (receive,
//! clipboard poll, heartbeat).

pub mod clipboard;
pub mod discovery;
pub mod engine;
pub mod peers;
pub mod protocol;
pub mod service;
pub mod transport;

mod error;

pub use error::{Error, Result};

// Re-export key types for convenience
pub use clipboard::{ClipboardAccess, SystemClipboard};
pub use engine::{LocalIdentity, SyncEngine, SyncEvent};
pub use peers::{Peer, PeerTable, PeerUpdate};
pub use protocol::WireMessage;
pub use service::{local_platform, Config, NexusClipService};
pub use transport::UdpTransport;
