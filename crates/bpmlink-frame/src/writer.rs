use std::io::ErrorKind;

use bpmlink_transport::{PartialTransfer, Transport, TransportError};
use tracing::trace;

use crate::codec::{hex_preview, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Send one complete packet (header already in place) over `transport`.
///
/// The packet goes out verbatim. It is size-checked first; a transfer that
/// moves fewer bytes than the packet holds is a [`FrameError::ShortWrite`].
pub fn encode_and_send<T: Transport + ?Sized>(
    transport: &mut T,
    packet: &[u8],
    config: &FrameConfig,
) -> Result<usize> {
    if packet.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            len: packet.len(),
            header: HEADER_SIZE,
        });
    }
    let limit = config.limit();
    if packet.len() > limit {
        return Err(FrameError::MessageTooLarge {
            size: packet.len(),
            max: limit,
        });
    }

    trace!(packet = %hex_preview(packet), "SEND");

    match transport.send_all(packet) {
        Ok(sent) if sent == packet.len() => Ok(sent),
        Ok(sent) => Err(FrameError::ShortWrite {
            sent,
            requested: packet.len(),
            source: TransportError::Partial(PartialTransfer {
                transferred: sent,
                requested: packet.len(),
                source: std::io::Error::from(ErrorKind::WriteZero),
            }),
        }),
        Err(source) => Err(FrameError::ShortWrite {
            sent: source.transferred().unwrap_or(0),
            requested: packet.len(),
            source,
        }),
    }
}
