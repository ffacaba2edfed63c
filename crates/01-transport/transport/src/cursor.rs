//! Head/tail bookkeeping shared by every single-producer/single-consumer ring.
//!
//! Positions live in `[0, 2 * capacity)` so that "full" and "empty" stay
//! distinguishable for any capacity, including ones that are not powers of
//! two. The producer owns `head`, the consumer owns `tail`; each side only
//! ever stores to its own counter.
//!
//! The consumer may park on `head` through [`wait`](crate::wait). The producer
//! only issues a wake when the consumer advertised that it is parked, so the
//! common path of a push is two atomic loads and one release store.

use crate::wait::{wait_u32, wake_one};
use crossbeam_utils::CachePadded;
#[cfg(feature = "loom")]
use loom::sync::atomic::{fence, AtomicU32, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{fence, AtomicU32, Ordering};

pub(crate) struct SpscCursor {
    capacity: u32,
    head: CachePadded<AtomicU32>,
    tail: CachePadded<AtomicU32>,
    consumer_parked: AtomicU32,
}

impl SpscCursor {
    /// `capacity` must be in `1..=MAX_SLOTS`; callers validate beforehand.
    pub(crate) fn new(capacity: u32) -> Self {
        debug_assert!(capacity > 0 && capacity <= crate::arena::MAX_SLOTS);
        Self {
            capacity,
            head: CachePadded::new(AtomicU32::new(0)),
            tail: CachePadded::new(AtomicU32::new(0)),
            consumer_parked: AtomicU32::new(0),
        }
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of committed, not yet consumed entries.
    pub(crate) fn len(&self) -> u32 {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        self.distance(head, tail)
    }

    /// Slot the producer may write next, or `None` when the ring is full.
    pub(crate) fn producer_slot(&self) -> Option<u32> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if self.distance(head, tail) >= self.capacity {
            return None;
        }
        Some(self.slot_of(head))
    }

    /// Publishes the slot returned by the last [`producer_slot`](Self::producer_slot).
    pub(crate) fn producer_commit(&self) {
        let head = self.head.load(Ordering::Relaxed);
        self.head.store(self.advance(head), Ordering::Release);
        fence(Ordering::SeqCst);
        if self.consumer_parked.load(Ordering::Relaxed) != 0 {
            wake_one(&self.head);
        }
    }

    /// Slot the consumer may read next, or `None` when the ring is empty.
    pub(crate) fn consumer_slot(&self) -> Option<u32> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        Some(self.slot_of(tail))
    }

    /// Retires the slot returned by the last [`consumer_slot`](Self::consumer_slot).
    pub(crate) fn consumer_commit(&self) {
        let tail = self.tail.load(Ordering::Relaxed);
        self.tail.store(self.advance(tail), Ordering::Release);
    }

    /// Parks the consumer until at least one entry is available.
    pub(crate) fn consumer_wait(&self) -> u32 {
        loop {
            if let Some(slot) = self.consumer_slot() {
                return slot;
            }
            self.consumer_parked.store(1, Ordering::Relaxed);
            fence(Ordering::SeqCst);
            let head = self.head.load(Ordering::Acquire);
            if head == self.tail.load(Ordering::Relaxed) {
                wait_u32(&self.head, head);
            }
            self.consumer_parked.store(0, Ordering::Relaxed);
        }
    }

    /// Marks every slot as committed, in order `0..capacity`.
    ///
    /// Only valid on a freshly created, empty cursor before it is shared.
    pub(crate) fn fill(&self) {
        debug_assert_eq!(self.len(), 0);
        self.head.store(self.capacity, Ordering::Release);
    }

    fn advance(&self, pos: u32) -> u32 {
        let next = pos + 1;
        if next == self.capacity * 2 {
            0
        } else {
            next
        }
    }

    fn distance(&self, head: u32, tail: u32) -> u32 {
        if head >= tail {
            head - tail
        } else {
            head + self.capacity * 2 - tail
        }
    }

    fn slot_of(&self, pos: u32) -> u32 {
        if pos >= self.capacity {
            pos - self.capacity
        } else {
            pos
        }
    }
}


#[cfg(all(test, feature = "loom"))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    #[test]
    #[ignore]
    fn slow_loom_cursor_hands_off_in_order() {
        loom::model(|| {
            const COUNT: u32 = 3;
            let cursor = Arc::new(SpscCursor::new(2));
            let entries = Arc::new([AtomicU32::new(0), AtomicU32::new(0)]);

            let producer = {
                let cursor = Arc::clone(&cursor);
                let entries = Arc::clone(&entries);
                thread::spawn(move || {
                    for value in 0..COUNT {
                        let slot = loop {
                            if let Some(slot) = cursor.producer_slot() {
                                break slot;
                            }
                            thread::yield_now();
                        };
                        entries[slot as usize].store(value, Ordering::Relaxed);
                        cursor.producer_commit();
                    }
                })
            };

            for expected in 0..COUNT {
                let slot = cursor.consumer_wait();
                assert_eq!(entries[slot as usize].load(Ordering::Relaxed), expected);
                cursor.consumer_commit();
            }

            producer.join().unwrap();
            assert_eq!(cursor.len(), 0, "ring must be empty at end");
        });
    }
}
