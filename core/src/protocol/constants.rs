//! Centralized protocol constants
//!
//! All wire-level tokens and timing constants are defined here to ensure
//! consistency across the codebase and make configuration easier.

use std::time::Duration;

/// Default UDP port; unicast and broadcast traffic share it
pub const SYNC_PORT: u16 = 4040;

/// Receive buffer size; an encoded frame must fit in a single datagram
pub const MAX_FRAME_SIZE: usize = 65535;

/// Discovery request literal
pub const DISCOVER_LITERAL: &str = "NEXUSCLIP_DISCOVER";

/// Device announce prefix; the payload is `platform|name`
pub const DEVICE_PREFIX: &str = "NEXUSCLIP_DEVICE:";

/// Clipboard content prefix; the payload is base64 text
pub const CLIP_PREFIX: &str = "NEXUSCLIP_CLIP:";

/// Acknowledgment prefix; the payload is a status token
pub const ACK_PREFIX: &str = "NEXUSCLIP_ACK:";

/// Heartbeat literal
pub const HEARTBEAT_LITERAL: &str = "NEXUSCLIP_HEARTBEAT";

/// Status token sent after applying a clipboard payload
pub const ACK_RECEIVED: &str = "RECEIVED";

/// mDNS service type for advertisement
pub const SERVICE_TYPE: &str = "_nexusclip._udp.local.";

/// Protocol version advertised over mDNS
pub const PROTOCOL_VERSION: &str = "1.0";

/// Interval between heartbeat broadcasts
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A peer unseen for longer than this is evicted
pub const STALE_TIMEOUT: Duration = Duration::from_secs(120);

/// Clipboard polling interval
pub const CLIPBOARD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Socket receive timeout; bounds how long shutdown can take
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);
