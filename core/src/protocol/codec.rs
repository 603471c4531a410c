//! Wire message codec
//!
//! Every datagram carries exactly one UTF-8 text frame. A frame either
//! equals one of the literal tokens or starts with a known prefix; anything
//! else decodes to [`WireMessage::Unknown`] and is dropped by the engine.
//! The port is shared with arbitrary broadcast traffic, so decoding never
//! returns an error.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::constants::{
    ACK_PREFIX, CLIP_PREFIX, DEVICE_PREFIX, DISCOVER_LITERAL, HEARTBEAT_LITERAL, MAX_FRAME_SIZE,
};
use crate::{Error, Result};

/// All wire message kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// Broadcast request asking peers to announce themselves
    Discover,
    /// Reply to a discovery request
    DeviceAnnounce { platform: String, name: String },
    /// Clipboard text, base64-encoded on the wire
    ClipboardPayload { text: String },
    /// Receipt acknowledgment with a free-form status token
    Ack { status: String },
    /// Periodic liveness signal
    Heartbeat,
    /// Anything that matched no token or failed payload decoding
    Unknown,
}

/// Encode a message to its text frame.
///
/// Fails when the encoded frame would not fit in a single datagram; large
/// clipboard content is rejected rather than truncated. [`WireMessage::Unknown`]
/// never leaves the decode path and is not encodable.
pub fn encode(message: &WireMessage) -> Result<String> {
    let frame = match message {
        WireMessage::Discover => DISCOVER_LITERAL.to_string(),
        WireMessage::DeviceAnnounce { platform, name } => {
            format!("{DEVICE_PREFIX}{platform}|{name}")
        }
        WireMessage::ClipboardPayload { text } => {
            format!("{CLIP_PREFIX}{}", BASE64.encode(text.as_bytes()))
        }
        WireMessage::Ack { status } => format!("{ACK_PREFIX}{status}"),
        WireMessage::Heartbeat => HEARTBEAT_LITERAL.to_string(),
        WireMessage::Unknown => {
            return Err(Error::Network("cannot encode an unknown message".to_string()))
        }
    };

    if frame.len() > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge {
            len: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    Ok(frame)
}

/// Decode a text frame. Never fails: corrupt or foreign frames come back as
/// [`WireMessage::Unknown`].
pub fn decode(frame: &str) -> WireMessage {
    if frame == DISCOVER_LITERAL {
        return WireMessage::Discover;
    }
    if frame == HEARTBEAT_LITERAL {
        return WireMessage::Heartbeat;
    }

    if let Some(payload) = frame.strip_prefix(DEVICE_PREFIX) {
        // Only the first '|' separates the fields; the name keeps the rest
        let mut parts = payload.splitn(2, '|');
        return match (parts.next(), parts.next()) {
            (Some(platform), Some(name)) => WireMessage::DeviceAnnounce {
                platform: platform.to_string(),
                name: name.to_string(),
            },
            _ => WireMessage::Unknown,
        };
    }

    if let Some(payload) = frame.strip_prefix(CLIP_PREFIX) {
        return match BASE64
            .decode(payload)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
        {
            Some(text) => WireMessage::ClipboardPayload { text },
            None => WireMessage::Unknown,
        };
    }

    if let Some(status) = frame.strip_prefix(ACK_PREFIX) {
        return WireMessage::Ack {
            status: status.to_string(),
        };
    }

    WireMessage::Unknown
}
