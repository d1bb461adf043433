//! Request numbering for log correlation.
//!
//! Numbers are diagnostic only. They never influence ordering or idempotency.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out request numbers, unique for the lifetime of the sequencer.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    counter: AtomicU64,
}

impl RequestSequencer {
    /// Create a sequencer whose first number is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Take the next request number.
    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently issued number, or 0 if none has been issued.
    #[must_use]
    pub fn last_id(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
