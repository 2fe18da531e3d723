//! Process-wide monotonic request id counter (spec.md §4.2).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Issues strictly increasing ids starting at 1, safe under concurrent
/// callers. Overflow of the 64-bit counter is a non-goal.
#[derive(Debug, Default)]
pub struct RequestId {
    next: AtomicU64,
}

impl RequestId {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next: AtomicU64::new(1),
        })
    }

    /// Returns the next id and advances the counter.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
