/*!
 * Block Resizing
 */

use super::backend::RegionAllocator;
use super::Heap;
use crate::core::limits::align_up;
use crate::core::types::Size;
use crate::memory::types::{MemoryError, MemoryPressure, MemoryResult};
use std::ptr::{self, NonNull};
use tracing::trace;

impl Heap {
    /// Resize a block, terminating the process if the heap is exhausted
    ///
    /// Shrinking and same-class resizes keep the address. Growth first tries
    /// the free region right after the block, then the one right before it
    /// (moving the contents down), and only then allocates, copies and frees.
    /// The first `min(old_size, new_size)` bytes are preserved on every path.
    ///
    /// Returns `None` only for `new_size == 0`, leaving the block untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block of this heap of exactly `old_size` bytes.
    /// On success the old address must no longer be used unless it equals
    /// the returned one.
    pub unsafe fn resize(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>> {
        if new_size == 0 {
            return None;
        }

        match unsafe { self.resize_with_pressure(ptr, old_size, new_size, MemoryPressure::Full) } {
            Some(block) => Some(block),
            None => self.out_of_memory(new_size),
        }
    }

    /// Resize a block, reporting exhaustion instead of terminating
    ///
    /// On error the original block is left untouched and still owned by the
    /// caller.
    ///
    /// # Safety
    ///
    /// Same contract as [`Heap::resize`].
    pub unsafe fn try_resize(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> MemoryResult<NonNull<u8>> {
        if new_size == 0 {
            return Err(MemoryError::ZeroSize);
        }

        unsafe { self.resize_with_pressure(ptr, old_size, new_size, MemoryPressure::Full) }.ok_or(
            MemoryError::OutOfMemory {
                requested: new_size,
                allocated: self.core.accounting.allocated(),
                pressure: MemoryPressure::Full,
            },
        )
    }

    unsafe fn resize_with_pressure(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
        max_pressure: MemoryPressure,
    ) -> Option<NonNull<u8>> {
        debug_assert!(old_size > 0, "resizing a zero-sized block");
        debug_assert!(self.contains(ptr), "{ptr:p} is not a heap pointer");

        let old_aligned = align_up(old_size);
        let new_aligned = align_up(new_size);

        if new_aligned <= old_aligned {
            if let Some(block) = unsafe { self.core.shrink_block(ptr, old_size, new_size) } {
                trace!(old_size, new_size, ptr = ?block, "Resized in place");
                return Some(block);
            }
        } else if let Some(block) = unsafe { self.grow_in_place(ptr, old_size, new_size) } {
            trace!(old_size, new_size, ptr = ?block, "Grew in place");
            return Some(block);
        }

        let block = self.allocate_with_pressure(new_size, max_pressure)?;
        // SAFETY: a fresh block never overlaps a live one.
        unsafe {
            ptr::copy_nonoverlapping(ptr.as_ptr(), block.as_ptr(), old_size.min(new_size));
            self.core.free_block(ptr, old_size);
        }

        trace!(old_size, new_size, from = ?ptr, to = ?block, "Resized by copy");
        Some(block)
    }

    unsafe fn grow_in_place(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>> {
        let old_aligned = align_up(old_size);
        let new_aligned = align_up(new_size);
        let required = new_aligned - old_aligned;

        if self.core.config.reclaim_before_each_alloc {
            self.reclaim(MemoryPressure::High);
        } else if self.core.accounting.should_reclaim(required) {
            self.reclaim(MemoryPressure::Low);
        }

        let block = unsafe {
            self.core
                .backend
                .grow_region(ptr, old_aligned, new_aligned, old_size)?
        };
        self.core.accounting.on_take(required);

        #[cfg(feature = "mem-stats")]
        {
            self.core.stats.record_free(old_size);
            self.core.stats.record_alloc(new_size);
        }

        Some(block)
    }
}
