//! Fixed-capacity arena of record slots.
//!
//! The arena owns every slot for its whole lifetime and addresses them by
//! index. It performs no synchronisation of its own: whoever holds a slot index
//! (through a ring handoff) is the only party allowed to touch that slot.

use crate::record::Record;
use crate::region::SharedRegion;
use crate::{TransportError, TransportResult};
use std::mem;

/// Alignment enforced for every slot inside an arena.
pub const SLOT_ALIGNMENT: usize = 64;

/// Largest slot count accepted by rings and pools.
pub const MAX_SLOTS: u32 = u32::MAX / 2;

pub(crate) struct RecordArena<const N: usize> {
    region: SharedRegion,
    stride: usize,
    slot_count: u32,
}

impl<const N: usize> RecordArena<N> {
    pub(crate) fn new(slot_count: u32) -> TransportResult<Self> {
        let () = Record::<N>::MARKERS_FIT;
        validate_slot_count(slot_count)?;
        let stride = align_up(mem::size_of::<Record<N>>(), SLOT_ALIGNMENT);
        let len = stride
            .checked_mul(slot_count as usize)
            .ok_or(TransportError::AllocationFailed {
                size: usize::MAX,
                alignment: SLOT_ALIGNMENT,
            })?;
        let region = SharedRegion::new_zeroed(len, SLOT_ALIGNMENT.max(4096))?;
        Ok(Self {
            region,
            stride,
            slot_count,
        })
    }

    pub(crate) fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// Raw pointer to slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of range.
    pub(crate) fn slot_ptr(&self, idx: u32) -> *mut Record<N> {
        assert!(idx < self.slot_count, "slot {idx} out of range");
        // SAFETY: `idx < slot_count` keeps the offset inside the region, and
        // `stride` is a multiple of the record alignment.
        unsafe { self.region.as_ptr().add(idx as usize * self.stride) as *mut Record<N> }
    }

    /// Shared view of slot `idx`.
    ///
    /// # Safety
    ///
    /// The caller must own `idx` and no mutable reference to it may be live.
    pub(crate) unsafe fn slot(&self, idx: u32) -> &Record<N> {
        &*self.slot_ptr(idx)
    }

    /// Exclusive view of slot `idx`.
    ///
    /// # Safety
    ///
    /// The caller must own `idx` exclusively for the lifetime of the borrow.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slot_mut(&self, idx: u32) -> &mut Record<N> {
        &mut *self.slot_ptr(idx)
    }
}

pub(crate) fn validate_slot_count(slot_count: u32) -> TransportResult<()> {
    if slot_count == 0 || slot_count > MAX_SLOTS {
        return Err(TransportError::InvalidCapacity {
            requested: slot_count as usize,
            minimum: 1,
            maximum: MAX_SLOTS as usize,
        });
    }
    Ok(())
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_aligned_and_disjoint() {
        let arena = RecordArena::<100>::new(4).expect("arena");
        let mut addrs = Vec::new();
        for idx in 0..arena.slot_count() {
            let addr = arena.slot_ptr(idx) as usize;
            assert_eq!(addr % SLOT_ALIGNMENT, 0, "slot {idx} must honor alignment");
            addrs.push(addr);
        }
        for pair in addrs.windows(2) {
            assert!(pair[1] - pair[0] >= mem::size_of::<Record<100>>());
        }
    }

    #[test]
    fn slots_start_zeroed() {
        let arena = RecordArena::<32>::new(2).expect("arena");
        // SAFETY: the arena is private to this test.
        let slot = unsafe { arena.slot(1) };
        assert_eq!(*slot, Record::<32>::zeroed());
    }

    #[test]
    fn zero_slots_is_invalid() {
        assert!(matches!(
            RecordArena::<8>::new(0),
            Err(TransportError::InvalidCapacity { requested: 0, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_slot_panics() {
        let arena = RecordArena::<8>::new(2).expect("arena");
        let _ = arena.slot_ptr(2);
    }
}
