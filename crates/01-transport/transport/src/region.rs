//! Aligned, contiguous memory backing the record arenas.
//!
//! Native targets prefer anonymous `mmap` regions, which are page aligned and
//! come back zero-filled from the kernel. When the mapping cannot satisfy the
//! alignment we fall back to the global allocator. Every allocation happens
//! once, at strategy initialisation; nothing in this module runs on the
//! producer path.

use crate::{TransportError, TransportResult};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

#[derive(Debug)]
enum Backing {
    #[cfg(not(target_arch = "wasm32"))]
    // Held so the mapping lives as long as the region.
    Mapped { _map: memmap2::MmapMut },
    Heap { ptr: NonNull<u8>, layout: Layout },
}

/// Zero-initialised, aligned region of `len` bytes.
#[derive(Debug)]
pub struct SharedRegion {
    len: usize,
    alignment: usize,
    ptr: NonNull<u8>,
    backing: Backing,
}

// SAFETY: the region owns its allocation outright; concurrent access to its
// contents is coordinated by the rings that hand out slot ownership.
unsafe impl Send for SharedRegion {}
// SAFETY: see above. `SharedRegion` itself never mutates through `&self`.
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Allocates `len` zeroed bytes aligned to `alignment`.
    pub fn new_zeroed(len: usize, alignment: usize) -> TransportResult<Self> {
        let failed = TransportError::AllocationFailed {
            size: len,
            alignment,
        };
        if len == 0 || alignment == 0 || !alignment.is_power_of_two() {
            return Err(failed);
        }

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(mut map) = Self::map_anonymous(len, alignment) {
            let ptr = NonNull::new(map.as_mut_ptr()).ok_or(failed.clone())?;
            return Ok(Self {
                len,
                alignment,
                ptr,
                backing: Backing::Mapped { _map: map },
            });
        }

        let layout = Layout::from_size_align(len, alignment).map_err(|_| failed.clone())?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).ok_or(failed)?;
        Ok(Self {
            len,
            alignment,
            ptr,
            backing: Backing::Heap { ptr, layout },
        })
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn map_anonymous(len: usize, alignment: usize) -> Option<memmap2::MmapMut> {
        let mut map = memmap2::MmapOptions::new().len(len).map_anon().ok()?;
        // Anonymous mappings are zero-filled; only the alignment needs checking.
        if map.as_mut_ptr() as usize % alignment != 0 {
            return None;
        }
        Some(map)
    }

    /// Total number of bytes managed by this region.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when the region has zero length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the alignment the region was allocated with.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns true when the region is an anonymous mapping.
    pub fn is_mapped(&self) -> bool {
        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.backing, Backing::Mapped { .. }) {
            return true;
        }
        false
    }

    /// Base pointer of the region.
    ///
    /// Writes through this pointer must be coordinated by the caller.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        if let Backing::Heap { ptr, layout } = &self.backing {
            // SAFETY: `ptr` was returned by `alloc_zeroed` with this exact layout.
            unsafe { dealloc(ptr.as_ptr(), *layout) };
        }
    }
}
