use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A one-way running/interrupted flag shared between an interrupt handler and
/// a poll loop.
///
/// Once cancelled it stays cancelled; there is no reset.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
