use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: command (1) + payload length (2, big-endian) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Largest message on the wire, header included.
pub const MAX_MESSAGE: usize = HEADER_SIZE + MAX_PAYLOAD;

const LENGTH_OFFSET: usize = 1;

/// Packets at or above this size are logged by length only.
const PREVIEW_LIMIT: usize = 32;

/// A decoded frame header.
///
/// `command` is opaque here. It belongs to the protocol layer and is carried
/// through unchanged in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: u8,
    pub payload_len: u16,
}

impl Header {
    /// Parse the first [`HEADER_SIZE`] bytes of a message.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            command: bytes[0],
            payload_len: u16::from_be_bytes([bytes[LENGTH_OFFSET], bytes[LENGTH_OFFSET + 1]]),
        }
    }

    /// Append the wire representation to `dst`.
    pub fn encode_into(self, dst: &mut BytesMut) {
        dst.put_u8(self.command);
        dst.put_u16(self.payload_len);
    }

    /// Header plus declared payload.
    pub fn message_len(self) -> usize {
        HEADER_SIZE + self.payload_len as usize
    }
}

/// A complete message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header byte 0, opaque to this layer.
    pub command: u8,
    /// The message body.
    pub payload: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(command: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// The total wire size of this message (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Encode into a fresh buffer.
    pub fn to_wire(&self) -> Result<BytesMut> {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        encode_message(self.command, &self.payload, &mut dst)?;
        Ok(dst)
    }
}

/// Append a message to `dst`.
///
/// Wire format:
/// ```text
/// ┌─────────────┬──────────────┬───────────────────┐
/// │ Command (1B)│ Length (2B BE)│ Payload           │
/// │ opaque      │              │ (Length bytes)    │
/// └─────────────┴──────────────┴───────────────────┘
/// ```
pub fn encode_message(command: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::MessageTooLarge {
            size: HEADER_SIZE + payload.len(),
            max: MAX_MESSAGE,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    Header {
        command,
        payload_len: payload.len() as u16,
    }
    .encode_into(dst);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one complete message occupying all of `src`.
///
/// Unlike a stream decoder this does not wait for more data: `src` must be
/// exactly header plus declared payload.
pub fn decode_message(src: &[u8]) -> Result<Message> {
    let Some(header_bytes) = src.first_chunk::<HEADER_SIZE>() else {
        return Err(FrameError::Truncated {
            len: src.len(),
            header: HEADER_SIZE,
        });
    };
    let header = Header::parse(header_bytes);

    let actual = src.len() - HEADER_SIZE;
    if actual != header.payload_len as usize {
        return Err(FrameError::LengthMismatch {
            declared: header.payload_len as usize,
            actual,
        });
    }

    Ok(Message {
        command: header.command,
        payload: Bytes::copy_from_slice(&src[HEADER_SIZE..]),
    })
}

/// Short human-readable rendering of a packet for trace logs.
pub fn hex_preview(data: &[u8]) -> String {
    if data.len() >= PREVIEW_LIMIT {
        return format!("{} bytes", data.len());
    }
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum message size in bytes, header included. Values above
    /// [`MAX_MESSAGE`] are clamped to it. Default: [`MAX_MESSAGE`].
    pub max_message_size: usize,
}

impl FrameConfig {
    /// The limit actually enforced.
    pub fn limit(&self) -> usize {
        self.max_message_size.min(MAX_MESSAGE)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE,
        }
    }
}
