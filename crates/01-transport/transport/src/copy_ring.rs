//! Bounded channel that moves whole records by value.
//!
//! A push copies the caller's record into ring storage; a pop copies it back
//! out into caller-owned memory. Both copies scale with the payload size.

use crate::arena::{validate_slot_count, RecordArena};
use crate::cursor::SpscCursor;
use crate::record::Record;
use crate::TransportResult;

/// Single-producer/single-consumer ring of `Record<N>` values.
pub(crate) struct CopyRing<const N: usize> {
    cursor: SpscCursor,
    storage: RecordArena<N>,
}

impl<const N: usize> CopyRing<N> {
    /// Allocates a ring holding at most `capacity` records.
    pub(crate) fn new(capacity: u32) -> TransportResult<Self> {
        validate_slot_count(capacity)?;
        Ok(Self {
            cursor: SpscCursor::new(capacity),
            storage: RecordArena::new(capacity)?,
        })
    }

    /// Maximum number of records the ring holds.
    pub(crate) fn capacity(&self) -> u32 {
        self.cursor.capacity()
    }

    /// Number of records waiting to be popped.
    pub(crate) fn len(&self) -> u32 {
        self.cursor.len()
    }

    /// Copies `record` into the ring without blocking.
    ///
    /// Returns `false` when the ring is full; the record is not stored.
    /// Must only be called from the single producer.
    pub(crate) fn try_push(&self, record: &Record<N>) -> bool {
        let Some(slot) = self.cursor.producer_slot() else {
            return false;
        };
        // SAFETY: the cursor grants the producer exclusive use of `slot`
        // until `producer_commit` publishes it.
        unsafe { self.storage.slot_mut(slot).clone_from(record) };
        self.cursor.producer_commit();
        true
    }

    /// Copies the oldest record out of the ring, if any. Consumer side only.
    pub(crate) fn try_pop(&self) -> Option<Record<N>> {
        let slot = self.cursor.consumer_slot()?;
        Some(self.take(slot))
    }

    /// Copies the oldest record out of the ring, parking until one arrives.
    /// Consumer side only.
    pub(crate) fn pop_blocking(&self) -> Record<N> {
        let slot = self.cursor.consumer_wait();
        self.take(slot)
    }

    fn take(&self, slot: u32) -> Record<N> {
        // SAFETY: the slot was published by the producer and stays owned by
        // the consumer until `consumer_commit`.
        let record = unsafe { self.storage.slot(slot) }.clone();
        self.cursor.consumer_commit();
        record
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use rand::prelude::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::thread;

    fn record(sequence: u32) -> Record<64> {
        let mut record = Record::zeroed();
        record.sequence = sequence;
        record.timestamp = i64::from(sequence) * 10;
        record.payload[1..5].copy_from_slice(&sequence.to_le_bytes());
        record.stamp_markers();
        record
    }

    #[test]
    fn push_rejects_when_full() {
        let ring = CopyRing::<64>::new(2).expect("ring");
        assert!(ring.try_push(&record(0)));
        assert!(ring.try_push(&record(1)));
        assert!(!ring.try_push(&record(2)));
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn popped_record_is_an_independent_copy() {
        let ring = CopyRing::<64>::new(1).expect("ring");
        let mut original = record(42);
        assert!(ring.try_push(&original));
        original.payload[10] = 0xFF;

        assert_eq!(ring.try_pop(), Some(record(42)));
        assert_eq!(ring.try_pop(), None);
    }

    /// Random push/pop interleavings agree with a `VecDeque` model, across
    /// several trips around the position space.
    #[test]
    fn random_interleaving_matches_model() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for capacity in [1u32, 3, 7, 10] {
            let ring = CopyRing::<64>::new(capacity).expect("ring");
            let mut model = VecDeque::new();
            let mut next = 0u32;
            for _ in 0..2_000 {
                if rng.gen_bool(0.55) {
                    let accepted = ring.try_push(&record(next));
                    assert_eq!(accepted, model.len() < capacity as usize);
                    if accepted {
                        model.push_back(next);
                    }
                    next += 1;
                } else {
                    let popped = ring.try_pop().map(|r| r.sequence);
                    assert_eq!(popped, model.pop_front());
                }
                assert_eq!(ring.len() as usize, model.len());
            }
        }
    }

    #[test]
    fn cross_thread_order_is_preserved() {
        const COUNT: u32 = 5_000;
        let ring = Arc::new(CopyRing::<64>::new(4).expect("ring"));
        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for sequence in 0..COUNT {
                    let record = record(sequence);
                    while !ring.try_push(&record) {
                        thread::yield_now();
                    }
                }
            })
        };
        for sequence in 0..COUNT {
            assert_eq!(ring.pop_blocking(), record(sequence));
        }
        producer.join().expect("producer thread");
    }
}
