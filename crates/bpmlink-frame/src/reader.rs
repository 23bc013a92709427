use bpmlink_transport::Transport;
use tracing::trace;

use crate::codec::{hex_preview, FrameConfig, Header, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Read one complete message into the front of `buf`.
///
/// Reads exactly [`HEADER_SIZE`] bytes, decodes the payload length, checks
/// that header plus payload fits both the configured limit and `buf`, then
/// reads exactly that many more bytes behind the header. Returns the total
/// message length. A zero-length payload returns right after the header
/// without touching the transport again.
///
/// Any short read is a framing failure. After one, the stream position is
/// unknown and the transport should be re-established, not resumed.
pub fn receive_and_decode<T: Transport + ?Sized>(
    transport: &mut T,
    buf: &mut [u8],
    config: &FrameConfig,
) -> Result<usize> {
    let Some(header_buf) = buf.first_chunk_mut::<HEADER_SIZE>() else {
        return Err(FrameError::BufferTooSmall {
            needed: HEADER_SIZE,
            capacity: buf.len(),
        });
    };

    transport
        .recv_all(header_buf)
        .map_err(|source| FrameError::ShortHeader {
            expected: HEADER_SIZE,
            received: source.transferred().unwrap_or(0),
            source,
        })?;

    let header = Header::parse(header_buf);
    let total = header.message_len();
    trace!(
        command = header.command,
        payload_len = header.payload_len,
        "received header"
    );

    let limit = config.limit();
    if total > limit {
        return Err(FrameError::MessageTooLarge {
            size: total,
            max: limit,
        });
    }
    if total > buf.len() {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            capacity: buf.len(),
        });
    }

    if header.payload_len > 0 {
        transport
            .recv_all(&mut buf[HEADER_SIZE..total])
            .map_err(|source| FrameError::ShortPayload {
                expected: header.payload_len as usize,
                received: source.transferred().unwrap_or(0),
                source,
            })?;
    }

    trace!(packet = %hex_preview(&buf[..total]), "RECV");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_message, MAX_MESSAGE};
    use crate::test_support::ScriptedTransport;

    fn wire(command: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_message(command, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn reads_single_message() {
        let mut transport = ScriptedTransport::socket().with_inbound(&wire(0x11, b"\x01\x02\x03"));
        let mut buf = vec![0u8; MAX_MESSAGE];

        let len = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default()).unwrap();

        assert_eq!(len, 6);
        assert_eq!(&buf[..len], &[0x11, 0x00, 0x03, 0x01, 0x02, 0x03]);
        assert_eq!(transport.recv_calls, 2);
    }

    #[test]
    fn zero_length_payload_needs_no_second_read() {
        let mut transport = ScriptedTransport::socket().with_inbound(&[0x20, 0x00, 0x00]);
        let mut buf = [0u8; 16];

        let len = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default()).unwrap();

        assert_eq!(len, HEADER_SIZE);
        assert_eq!(transport.recv_calls, 1);
    }

    #[test]
    fn leaves_following_message_unread() {
        let mut inbound = wire(1, b"first");
        inbound.extend(wire(2, b"second"));
        let mut transport = ScriptedTransport::serial().with_inbound(&inbound);
        let mut buf = [0u8; 64];

        let len = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default()).unwrap();
        assert_eq!(&buf[HEADER_SIZE..len], b"first");

        let len = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default()).unwrap();
        assert_eq!(buf[0], 2);
        assert_eq!(&buf[HEADER_SIZE..len], b"second");
        assert!(transport.inbound.is_empty());
    }

    #[test]
    fn short_header_is_framing_failure() {
        let mut transport = ScriptedTransport::socket().with_inbound(&[0x11, 0x00]);
        let mut buf = [0u8; 16];

        let err = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default())
            .unwrap_err();

        assert!(matches!(
            err,
            FrameError::ShortHeader {
                expected: HEADER_SIZE,
                received: 2,
                ..
            }
        ));
        assert!(err.is_communication());
    }

    #[test]
    fn peer_closing_mid_payload_is_framing_failure() {
        let mut transport =
            ScriptedTransport::serial().with_inbound(&[0x11, 0x00, 0x08, 0xAA, 0xBB, 0xCC]);
        let mut buf = [0u8; 32];

        let err = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default())
            .unwrap_err();

        assert!(matches!(
            err,
            FrameError::ShortPayload {
                expected: 8,
                received: 3,
                ..
            }
        ));
    }

    #[test]
    fn oversized_message_rejected_before_payload_read() {
        let mut transport =
            ScriptedTransport::socket().with_inbound(&[0x11, 0x04, 0x00, 0x00, 0x00]);
        let mut buf = vec![0u8; MAX_MESSAGE];
        let cfg = FrameConfig {
            max_message_size: 64,
        };

        let err = receive_and_decode(&mut transport, &mut buf, &cfg).unwrap_err();

        assert!(matches!(
            err,
            FrameError::MessageTooLarge {
                size: 1027,
                max: 64
            }
        ));
        assert_eq!(transport.recv_calls, 1);
    }

    #[test]
    fn small_caller_buffer_rejected_before_payload_read() {
        let mut transport = ScriptedTransport::socket().with_inbound(&wire(3, &[0u8; 20]));
        let mut buf = [0u8; 10];

        let err = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default())
            .unwrap_err();

        assert!(matches!(
            err,
            FrameError::BufferTooSmall {
                needed: 23,
                capacity: 10
            }
        ));
        assert_eq!(transport.recv_calls, 1);
    }

    #[test]
    fn buffer_smaller_than_header_touches_nothing() {
        let mut transport = ScriptedTransport::socket().with_inbound(&wire(3, b"x"));
        let mut buf = [0u8; 2];

        let err = receive_and_decode(&mut transport, &mut buf, &FrameConfig::default())
            .unwrap_err();

        assert!(matches!(err, FrameError::BufferTooSmall { needed: 3, .. }));
        assert_eq!(transport.recv_calls, 0);
    }
}
