//! Length-prefixed message framing for BPM control transports.
//!
//! Every message on the wire is a 3-byte header followed by its payload:
//! - 1 byte command code, passed through untouched
//! - 2 bytes big-endian payload length
//!
//! The protocol layer above hands this crate complete packets and gets complete
//! packets back through [`PacketIo`]. No partial reads, no stream resync.

pub mod codec;
pub mod error;
pub mod framed;
pub mod reader;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use codec::{
    decode_message, encode_message, hex_preview, FrameConfig, Header, Message, HEADER_SIZE,
    MAX_MESSAGE, MAX_PAYLOAD,
};
pub use error::{FrameError, Result};
pub use framed::{FramedTransport, PacketIo};
pub use reader::receive_and_decode;
pub use writer::encode_and_send;
