//! In-memory transports for codec tests.

use std::collections::VecDeque;

use bpmlink_transport::io::{transfer, Direction};
use bpmlink_transport::{Result, Transport, TransportKind};

/// A scripted peer: `inbound` is what the device "sends", `outbound` collects
/// what the client wrote. Each primitive call moves at most `chunk` bytes, to
/// mimic short socket reads or a slow serial line.
pub struct ScriptedTransport {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub chunk: usize,
    pub kind: TransportKind,
    pub recv_calls: usize,
    pub send_calls: usize,
    /// When set, writes stop being accepted after this many bytes.
    pub write_budget: Option<usize>,
}

impl ScriptedTransport {
    pub fn new(kind: TransportKind, chunk: usize) -> Self {
        Self {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            chunk,
            kind,
            recv_calls: 0,
            send_calls: 0,
            write_budget: None,
        }
    }

    /// Simulated socket: large, irregular segments.
    pub fn socket() -> Self {
        Self::new(TransportKind::Tcp, 1460)
    }

    /// Simulated serial line: one byte at a time.
    pub fn serial() -> Self {
        Self::new(TransportKind::Serial, 1)
    }

    pub fn with_inbound(mut self, bytes: &[u8]) -> Self {
        self.inbound.extend(bytes.iter().copied());
        self
    }

    /// Move everything written so far back to the inbound side (echo device).
    pub fn loop_back(&mut self) {
        let written = std::mem::take(&mut self.outbound);
        self.inbound.extend(written);
    }
}

impl Transport for ScriptedTransport {
    fn send_all(&mut self, buf: &[u8]) -> Result<usize> {
        self.send_calls += 1;
        let outbound = &mut self.outbound;
        let chunk = self.chunk;
        let budget = &mut self.write_budget;
        transfer(Direction::Write, buf.len(), |offset| {
            let mut n = chunk.min(buf.len() - offset);
            if let Some(left) = budget.as_mut() {
                n = n.min(*left);
                *left -= n;
            }
            outbound.extend_from_slice(&buf[offset..offset + n]);
            Ok(n)
        })
        .map_err(Into::into)
    }

    fn recv_all(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.recv_calls += 1;
        let inbound = &mut self.inbound;
        let chunk = self.chunk;
        let requested = buf.len();
        transfer(Direction::Read, requested, |offset| {
            let n = chunk.min(requested - offset).min(inbound.len());
            for (slot, byte) in buf[offset..offset + n].iter_mut().zip(inbound.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        })
        .map_err(Into::into)
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn describe(&self) -> String {
        format!("scripted-{}", self.kind)
    }
}
