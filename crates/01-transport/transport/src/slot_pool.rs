//! Fixed-size record pool with free and data index rings.
//!
//! `M` record slots are allocated once. Two SPSC index rings of capacity `M`
//! track them: the free ring holds slots nobody owns, the data ring holds
//! filled slots awaiting consumption. A slot index is only ever in one place
//! at a time:
//!
//! ```text
//!  free ring ──try_acquire──▶ Acquired ──submit──▶ data ring
//!      ▲                                              │
//!      └────────release──── Owned ◀──receive──────────┘
//! ```
//!
//! Ownership moves through the rings; payload memory is never shared between
//! two live owners, so no lock guards it.

use crate::arena::{validate_slot_count, RecordArena};
use crate::claim::{SideClaim, SideGuard};
use crate::index_ring::IndexRing;
use crate::record::Record;
use crate::TransportResult;
use std::ops::{Deref, DerefMut};
#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicU32, Ordering};

const NO_SPARE: u32 = u32::MAX;

/// Opaque, copyable reference to a pool slot.
///
/// Handles stay valid for the lifetime of the pool that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle(u32);

impl SlotHandle {
    /// Index of the slot inside its pool.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Where the pool's slots currently are.
///
/// Read from two independent rings, so a snapshot taken while both sides run
/// is approximate; it is exact whenever the pool is quiescent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolOccupancy {
    /// Slots in the free ring.
    pub free: u32,
    /// Slots taken by the producer and not yet submitted, including a slot
    /// the producer set aside unsubmitted for its next acquire.
    pub acquired: u32,
    /// Slots in the data ring.
    pub in_transit: u32,
    /// Slots received by the consumer and not yet released.
    pub owned: u32,
}

impl PoolOccupancy {
    /// Sum of all four states; equals the slot count on a quiescent pool.
    pub fn total(&self) -> u32 {
        self.free + self.acquired + self.in_transit + self.owned
    }
}

pub(crate) struct BufferPool<const N: usize> {
    slots: RecordArena<N>,
    free_ring: IndexRing,
    data_ring: IndexRing,
    acquired: AtomicU32,
    owned: AtomicU32,
    spare: AtomicU32,
    producer: SideClaim,
    consumer: SideClaim,
    releaser: SideClaim,
}

impl<const N: usize> BufferPool<N> {
    /// Allocates `slot_count` slots; all of them start in the free ring.
    pub(crate) fn new(slot_count: u32) -> TransportResult<Self> {
        validate_slot_count(slot_count)?;
        Ok(Self {
            slots: RecordArena::new(slot_count)?,
            free_ring: IndexRing::new_filled(slot_count),
            data_ring: IndexRing::new(slot_count),
            acquired: AtomicU32::new(0),
            owned: AtomicU32::new(0),
            spare: AtomicU32::new(NO_SPARE),
            producer: SideClaim::new("producer"),
            consumer: SideClaim::new("consumer"),
            releaser: SideClaim::new("release"),
        })
    }

    pub(crate) fn slot_count(&self) -> u32 {
        self.slots.slot_count()
    }

    pub(crate) fn occupancy(&self) -> PoolOccupancy {
        PoolOccupancy {
            free: self.free_ring.len(),
            acquired: self.acquired.load(Ordering::Acquire),
            in_transit: self.data_ring.len(),
            owned: self.owned.load(Ordering::Acquire),
        }
    }

    /// Pops a free slot without blocking. Producer side only.
    ///
    /// The producer side stays claimed until the returned slot is submitted
    /// or dropped, so at most one slot is acquired at any time.
    pub(crate) fn try_acquire(&self) -> Option<Acquired<'_, N>> {
        let side = self.producer.enter();
        let idx = match self.spare.swap(NO_SPARE, Ordering::Relaxed) {
            NO_SPARE => {
                let idx = self.free_ring.pop()?;
                self.acquired.fetch_add(1, Ordering::AcqRel);
                idx
            }
            idx => idx,
        };
        Some(Acquired {
            pool: self,
            handle: SlotHandle(idx),
            submitted: false,
            _side: side,
        })
    }

    /// Pops the next filled slot, parking until one arrives. Consumer side only.
    pub(crate) fn receive_blocking(&self) -> Owned<'_, N> {
        let _side = self.consumer.enter();
        let idx = self.data_ring.pop_blocking();
        self.take_owned(idx)
    }

    /// Pops the next filled slot if one is ready. Consumer side only.
    pub(crate) fn try_receive(&self) -> Option<Owned<'_, N>> {
        let _side = self.consumer.enter();
        let idx = self.data_ring.pop()?;
        Some(self.take_owned(idx))
    }

    fn take_owned(&self, idx: u32) -> Owned<'_, N> {
        self.owned.fetch_add(1, Ordering::AcqRel);
        Owned {
            pool: self,
            handle: SlotHandle(idx),
        }
    }

    fn push_data(&self, handle: SlotHandle) {
        self.acquired.fetch_sub(1, Ordering::AcqRel);
        if let Err(idx) = self.data_ring.push(handle.0) {
            panic!(
                "data ring overflowed pushing slot {idx}: ring capacity {} must equal pool size {}",
                self.data_ring.capacity(),
                self.slot_count()
            );
        }
    }

    // The free ring's push side is separate from the data ring's pop side, so
    // a release may run while the consumer is parked in `receive_blocking`.
    fn push_free(&self, handle: SlotHandle) {
        let _side = self.releaser.enter();
        self.owned.fetch_sub(1, Ordering::AcqRel);
        if let Err(idx) = self.free_ring.push(handle.0) {
            panic!(
                "free ring overflowed releasing slot {idx}: ring capacity {} must equal pool size {}",
                self.free_ring.capacity(),
                self.slot_count()
            );
        }
    }
}

/// A slot taken from the free ring by the producer.
///
/// Write the record in place, then [`submit`](Acquired::submit) it. Dropping
/// an unsubmitted slot keeps it on the producer side as a spare that the next
/// [`BufferPool::try_acquire`] hands out again; only the consumer ever pushes
/// to the free ring.
pub(crate) struct Acquired<'a, const N: usize> {
    pool: &'a BufferPool<N>,
    handle: SlotHandle,
    submitted: bool,
    _side: SideGuard<'a>,
}

impl<const N: usize> Acquired<'_, N> {
    #[cfg(test)]
    pub(crate) fn handle(&self) -> SlotHandle {
        self.handle
    }

    /// Hands the slot to the consumer through the data ring.
    pub(crate) fn submit(mut self) {
        self.submitted = true;
        self.pool.push_data(self.handle);
    }
}

impl<const N: usize> Deref for Acquired<'_, N> {
    type Target = Record<N>;

    fn deref(&self) -> &Record<N> {
        // SAFETY: the producer owns this slot until `submit`.
        unsafe { self.pool.slots.slot(self.handle.0) }
    }
}

impl<const N: usize> DerefMut for Acquired<'_, N> {
    fn deref_mut(&mut self) -> &mut Record<N> {
        // SAFETY: the producer owns this slot until `submit`, and `&mut self`
        // rules out a second borrow through this guard.
        unsafe { self.pool.slots.slot_mut(self.handle.0) }
    }
}

impl<const N: usize> Drop for Acquired<'_, N> {
    fn drop(&mut self) {
        if !self.submitted {
            self.pool.spare.store(self.handle.0, Ordering::Relaxed);
        }
    }
}

/// A filled slot received by the consumer.
///
/// The record is read in place. Dropping the guard releases the slot back to
/// the free ring, so a slot is released exactly once per receive. The guard
/// may be dropped on any thread, including while the consumer is parked
/// waiting for the next slot; two releases must not overlap.
pub struct Owned<'a, const N: usize> {
    pool: &'a BufferPool<N>,
    handle: SlotHandle,
}

impl<const N: usize> Owned<'_, N> {
    /// Handle of the slot being read.
    pub fn handle(&self) -> SlotHandle {
        self.handle
    }
}

impl<const N: usize> Deref for Owned<'_, N> {
    type Target = Record<N>;

    fn deref(&self) -> &Record<N> {
        // SAFETY: the consumer owns this slot until the guard drops.
        unsafe { self.pool.slots.slot(self.handle.0) }
    }
}

impl<const N: usize> Drop for Owned<'_, N> {
    fn drop(&mut self) {
        self.pool.push_free(self.handle);
    }
}

impl<const N: usize> std::fmt::Debug for Owned<'_, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owned")
            .field("handle", &self.handle)
            .field("sequence", &self.sequence)
            .finish()
    }
}
