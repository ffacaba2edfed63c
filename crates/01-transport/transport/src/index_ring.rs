//! Bounded SPSC queue of slot indices.
//!
//! Each entry is a single `u32`, so a push or pop moves four bytes regardless
//! of how large the slots they name are.

use crate::cursor::SpscCursor;
#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicU32, Ordering};

pub(crate) struct IndexRing {
    cursor: SpscCursor,
    entries: Box<[AtomicU32]>,
}

impl IndexRing {
    pub(crate) fn new(capacity: u32) -> Self {
        let entries = (0..capacity).map(|_| AtomicU32::new(0)).collect();
        Self {
            cursor: SpscCursor::new(capacity),
            entries,
        }
    }

    /// Creates a ring already holding `0..capacity` in order.
    pub(crate) fn new_filled(capacity: u32) -> Self {
        let entries = (0..capacity).map(AtomicU32::new).collect();
        let ring = Self {
            cursor: SpscCursor::new(capacity),
            entries,
        };
        ring.cursor.fill();
        ring
    }

    pub(crate) fn len(&self) -> u32 {
        self.cursor.len()
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.cursor.capacity()
    }

    /// Non-blocking push. Hands `value` back when the ring is full.
    pub(crate) fn push(&self, value: u32) -> Result<(), u32> {
        let Some(slot) = self.cursor.producer_slot() else {
            return Err(value);
        };
        self.entries[slot as usize].store(value, Ordering::Relaxed);
        self.cursor.producer_commit();
        Ok(())
    }

    /// Non-blocking pop.
    pub(crate) fn pop(&self) -> Option<u32> {
        let slot = self.cursor.consumer_slot()?;
        Some(self.take(slot))
    }

    /// Pops, parking the caller until a value is available.
    pub(crate) fn pop_blocking(&self) -> u32 {
        let slot = self.cursor.consumer_wait();
        self.take(slot)
    }

    fn take(&self, slot: u32) -> u32 {
        let value = self.entries[slot as usize].load(Ordering::Relaxed);
        self.cursor.consumer_commit();
        value
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_and_backpressure() {
        let ring = IndexRing::new(4);
        for value in [9, 3, 7, 1] {
            ring.push(value).expect("space");
        }
        assert_eq!(ring.push(5), Err(5), "full ring hands the value back");
        let drained: Vec<u32> = std::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(drained, vec![9, 3, 7, 1]);
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn filled_ring_yields_every_index() {
        let ring = IndexRing::new_filled(6);
        assert_eq!(ring.len(), 6);
        let drained: Vec<u32> = std::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(drained, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn blocking_pop_crosses_threads() {
        const COUNT: u32 = 10_000;
        let ring = Arc::new(IndexRing::new(8));
        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for value in 0..COUNT {
                    while ring.push(value).is_err() {
                        thread::yield_now();
                    }
                }
            })
        };
        for expected in 0..COUNT {
            assert_eq!(ring.pop_blocking(), expected);
        }
        producer.join().expect("producer thread");
        assert_eq!(ring.len(), 0);
    }
}
