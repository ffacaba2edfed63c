//! Single-occupancy markers for the producer and consumer sides of a ring.
//!
//! Every ring here is single-producer/single-consumer. A `SideClaim` is held
//! for the duration of each ring operation on its side; finding it already
//! held means two threads are driving the same side at once, which would
//! corrupt the ring bookkeeping, so it panics instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) struct SideClaim {
    busy: AtomicBool,
    side: &'static str,
}

impl SideClaim {
    pub(crate) const fn new(side: &'static str) -> Self {
        Self {
            busy: AtomicBool::new(false),
            side,
        }
    }

    pub(crate) fn enter(&self) -> SideGuard<'_> {
        if self.busy.swap(true, Ordering::Acquire) {
            panic!(
                "concurrent {} access: transports accept exactly one producer and one consumer",
                self.side
            );
        }
        SideGuard { claim: self }
    }
}

pub(crate) struct SideGuard<'a> {
    claim: &'a SideClaim,
}

impl Drop for SideGuard<'_> {
    fn drop(&mut self) {
        self.claim.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_entries_succeed() {
        let claim = SideClaim::new("producer");
        drop(claim.enter());
        drop(claim.enter());
    }

    #[test]
    #[should_panic(expected = "concurrent consumer access")]
    fn overlapping_entry_panics() {
        let claim = SideClaim::new("consumer");
        let _first = claim.enter();
        let _second = claim.enter();
    }
}
