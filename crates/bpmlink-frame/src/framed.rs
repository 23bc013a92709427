use bpmlink_transport::{Transport, TransportKind};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::codec::{decode_message, FrameConfig, Message, HEADER_SIZE, MAX_MESSAGE};
use crate::error::{FrameError, Result};
use crate::reader::receive_and_decode;
use crate::writer::encode_and_send;

/// The packet boundary a protocol library is written against.
///
/// `send` takes a complete packet, header included. `recv` fills `buf` with one
/// complete packet and returns its length.
pub trait PacketIo {
    fn send(&mut self, packet: &[u8]) -> Result<()>;
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<P: PacketIo + ?Sized> PacketIo for &mut P {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        (**self).send(packet)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).recv(buf)
    }
}

/// A transport with message framing on top.
///
/// Strictly one request in flight: callers alternate `send` and `recv`. After
/// any framing failure the stream position is unknown, so every later call
/// fails with [`FrameError::Desynchronized`] until the caller drops this value
/// and reconnects.
pub struct FramedTransport<T> {
    inner: T,
    config: FrameConfig,
    rx: Box<[u8]>,
    desynchronized: bool,
}

impl<T: Transport> FramedTransport<T> {
    /// Wrap a transport with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Wrap a transport with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            config,
            rx: vec![0u8; MAX_MESSAGE].into_boxed_slice(),
            desynchronized: false,
        }
    }

    /// Receive one message into the internal buffer and return it owned.
    pub fn recv_message(&mut self) -> Result<Message> {
        self.ensure_synchronized()?;
        let len = self.receive_into_internal()?;
        decode_message(&self.rx[..len])
    }

    /// Send a packet and wait for the matching response.
    pub fn request(&mut self, packet: &[u8]) -> Result<Message> {
        PacketIo::send(self, packet)?;
        self.recv_message()
    }

    /// Build a packet from `command` and `payload`, send it, and wait for the
    /// response.
    pub fn request_message(&mut self, command: u8, payload: &[u8]) -> Result<Message> {
        let packet = Message::new(command, Bytes::copy_from_slice(payload)).to_wire()?;
        self.request(&packet)
    }

    /// Whether an earlier framing failure poisoned the stream.
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// The backend kind underneath.
    pub fn kind(&self) -> TransportKind {
        self.inner.kind()
    }

    /// Current frame configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the framing layer and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn ensure_synchronized(&self) -> Result<()> {
        if self.desynchronized {
            return Err(FrameError::Desynchronized);
        }
        Ok(())
    }

    fn receive_into_internal(&mut self) -> Result<usize> {
        let result = receive_and_decode(&mut self.inner, &mut self.rx, &self.config);
        self.track(result)
    }

    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(err) = &result {
            warn!(
                transport = %self.inner.describe(),
                error = %err,
                "framing failure; stream must be re-established"
            );
            self.desynchronized = true;
        }
        result
    }
}

impl<T: Transport> PacketIo for FramedTransport<T> {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.ensure_synchronized()?;
        match encode_and_send(&mut self.inner, packet, &self.config) {
            Ok(_) => Ok(()),
            // Nothing went out; the stream is still aligned.
            Err(err @ (FrameError::Truncated { .. } | FrameError::MessageTooLarge { .. })) => {
                debug!(error = %err, "packet rejected before send");
                Err(err)
            }
            Err(err) => self.track(Err(err)),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_synchronized()?;
        if buf.len() < HEADER_SIZE {
            return Err(FrameError::BufferTooSmall {
                needed: HEADER_SIZE,
                capacity: buf.len(),
            });
        }
        let result = receive_and_decode(&mut self.inner, buf, &self.config);
        self.track(result)
    }
}

impl<T: Transport> std::fmt::Debug for FramedTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedTransport")
            .field("transport", &self.inner.describe())
            .field("max_message_size", &self.config.limit())
            .field("desynchronized", &self.desynchronized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_message, MAX_PAYLOAD};
    use crate::test_support::ScriptedTransport;

    fn packet(command: u8, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_message(command, payload, &mut buf).unwrap();
        buf
    }

    #[test]
    fn roundtrip_over_lossless_loopback() {
        for len in [0usize, 1, 2, 31, 32, 255, 256, 4096, MAX_PAYLOAD] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let mut framed = FramedTransport::new(ScriptedTransport::socket());

            framed.send(&packet(0x42, &payload)).unwrap();
            framed.get_mut().loop_back();
            let message = framed.recv_message().unwrap();

            assert_eq!(message.command, 0x42);
            assert_eq!(message.payload.len(), len);
            assert_eq!(message.payload.as_ref(), payload.as_slice());
        }
    }

    #[test]
    fn recv_fills_caller_buffer_with_whole_packet() {
        let wire = packet(0x51, &[0x00, 0x01]);
        let mut framed = FramedTransport::new(ScriptedTransport::socket().with_inbound(&wire));
        let mut buf = [0u8; 16];

        let len = framed.recv(&mut buf).unwrap();

        assert_eq!(&buf[..len], wire.as_ref());
    }

    #[test]
    fn socket_and_serial_decode_identically() {
        let mut inbound = Vec::new();
        let script: [(u8, &[u8]); 3] = [(0x11, b""), (0x13, b"\x00\x01\x02"), (0x51, &[7u8; 300])];
        for (command, payload) in script {
            inbound.extend_from_slice(&packet(command, payload));
        }

        let mut decoded = Vec::new();
        for transport in [ScriptedTransport::socket(), ScriptedTransport::serial()] {
            let mut framed = FramedTransport::new(transport.with_inbound(&inbound));
            let messages: Vec<Message> = (0..3).map(|_| framed.recv_message().unwrap()).collect();
            decoded.push((framed.kind(), messages));
        }

        assert_eq!(decoded[0].0, TransportKind::Tcp);
        assert_eq!(decoded[1].0, TransportKind::Serial);
        assert_eq!(decoded[0].1, decoded[1].1);
    }

    #[test]
    fn framing_failure_poisons_further_use() {
        let mut framed =
            FramedTransport::new(ScriptedTransport::socket().with_inbound(&[0x11, 0x00, 0x05, 1]));

        let err = framed.recv_message().unwrap_err();
        assert!(matches!(err, FrameError::ShortPayload { .. }));
        assert!(framed.is_desynchronized());

        assert!(matches!(framed.send(&[0, 0, 0]), Err(FrameError::Desynchronized)));
        let mut buf = [0u8; 8];
        assert!(matches!(framed.recv(&mut buf), Err(FrameError::Desynchronized)));
    }

    #[test]
    fn rejected_packet_keeps_stream_usable() {
        let mut framed = FramedTransport::with_config(
            ScriptedTransport::socket(),
            FrameConfig {
                max_message_size: 4,
            },
        );

        assert!(framed.send(&[0u8; 5]).is_err());
        assert!(!framed.is_desynchronized());
        framed.send(&[0x01, 0x00, 0x00]).unwrap();
    }

    #[test]
    fn request_message_round_trip() {
        let mut transport = ScriptedTransport::serial();
        transport
            .inbound
            .extend(packet(0x11, &[0x00]).iter().copied());
        let mut framed = FramedTransport::new(transport);

        let reply = framed.request_message(0x10, &[]).unwrap();

        assert_eq!(framed.get_ref().outbound, vec![0x10, 0x00, 0x00]);
        assert_eq!(reply, Message::new(0x11, vec![0x00]));
    }
}
