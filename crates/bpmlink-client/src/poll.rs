use std::io;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::descriptor::{CallDescriptor, MAX_CURVE_SIZE};
use crate::error::{ClientError, Result};
use crate::protocol::Protocol;

/// Default pause between samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of sample slots.
pub const DEFAULT_RING_SLOTS: usize = 16;

/// Largest sample ring a poll loop may allocate, all slots together.
pub const MAX_RING_SIZE: usize = MAX_CURVE_SIZE;

/// Poll loop configuration.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between the end of one sample and the start of the next.
    pub interval: Duration,
    /// Number of slots in the sample ring.
    pub ring_slots: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            ring_slots: DEFAULT_RING_SLOTS,
        }
    }
}

/// Waits out the inter-sample interval.
///
/// Implementations should return early once `cancel` is set.
pub trait Pacer {
    fn suspend(&mut self, interval: Duration, cancel: &CancellationToken);
}

/// Sleeps the calling thread in short slices, checking for cancellation
/// between slices.
#[derive(Debug, Clone)]
pub struct ThreadPacer {
    slice: Duration,
}

impl ThreadPacer {
    pub fn new(slice: Duration) -> Self {
        Self { slice }
    }
}

impl Default for ThreadPacer {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl Pacer for ThreadPacer {
    fn suspend(&mut self, interval: Duration, cancel: &CancellationToken) {
        let deadline = Instant::now() + interval;
        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(self.slice.min(deadline - now));
        }
    }
}

/// A fixed set of equally sized sample buffers, handed out round robin.
#[derive(Debug, Clone)]
pub struct SampleRing {
    buf: Vec<u8>,
    slot_size: usize,
    slots: usize,
    next: usize,
}

impl SampleRing {
    /// `None` if the ring cannot be allocated. A zero slot count is treated as
    /// one slot.
    pub fn new(slots: usize, slot_size: usize) -> Option<Self> {
        let slots = slots.max(1);
        let bytes = slots.checked_mul(slot_size)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(bytes).ok()?;
        buf.resize(bytes, 0);
        Some(Self {
            buf,
            slot_size,
            slots,
            next: 0,
        })
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Index and buffer of the next slot; the oldest sample is overwritten.
    pub fn next_slot(&mut self) -> (usize, &mut [u8]) {
        let index = self.next;
        self.next = (self.next + 1) % self.slots;
        let start = index * self.slot_size;
        (index, &mut self.buf[start..start + self.slot_size])
    }

    pub fn slot(&self, index: usize) -> &[u8] {
        let start = index * self.slot_size;
        &self.buf[start..start + self.slot_size]
    }
}

/// One emitted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample<'a> {
    /// Zero-based sample number.
    pub seq: u64,
    /// Ring slot the sample was read into.
    pub slot: usize,
    pub data: &'a [u8],
}

/// How a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub samples: u64,
}

/// Reads one operation over and over until cancelled.
///
/// Cancellation is cooperative: the token is checked before every read and
/// again before every pause. A read already in progress always completes and
/// its sample is emitted.
#[derive(Debug, Clone)]
pub struct PollLoop {
    config: PollConfig,
    cancel: CancellationToken,
}

impl PollLoop {
    pub fn new(config: PollConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Poll `descriptor`, handing each sample to `sink` as soon as it arrives.
    ///
    /// The descriptor must be armed; its state is not changed. Any protocol or
    /// sink error ends the loop.
    pub fn run<P, C, F>(
        &self,
        protocol: &mut P,
        descriptor: &CallDescriptor,
        pacer: &mut C,
        mut sink: F,
    ) -> Result<PollSummary>
    where
        P: Protocol + ?Sized,
        C: Pacer + ?Sized,
        F: FnMut(&Sample<'_>) -> io::Result<()>,
    {
        if !descriptor.is_armed() {
            return Err(ClientError::NotArmed(descriptor.name().to_string()));
        }
        let slot_size = descriptor.sample_size()?;
        let ring_bytes = self.config.ring_slots.max(1).saturating_mul(slot_size);
        let too_large = || ClientError::Allocation {
            operation: descriptor.name().to_string(),
            bytes: ring_bytes,
        };
        if ring_bytes > MAX_RING_SIZE {
            return Err(too_large());
        }
        let mut ring =
            SampleRing::new(self.config.ring_slots, slot_size).ok_or_else(too_large)?;

        info!(
            operation = descriptor.name(),
            interval_ms = self.config.interval.as_millis() as u64,
            slots = ring.slots(),
            "polling started"
        );

        let mut seq = 0u64;
        while !self.cancel.is_cancelled() {
            let (slot, buf) = ring.next_slot();
            let len = descriptor.sample(protocol, buf)?;
            let sample = Sample {
                seq,
                slot,
                data: &buf[..len],
            };
            sink(&sample).map_err(ClientError::Sink)?;
            seq += 1;

            if self.cancel.is_cancelled() {
                debug!(seq, "cancelled after read");
                break;
            }
            pacer.suspend(self.config.interval, &self.cancel);
        }

        info!(operation = descriptor.name(), samples = seq, "polling stopped");
        Ok(PollSummary { samples: seq })
    }
}
