/*!
 * Allocation Orchestrator
 *
 * Pool cache first, then the region allocator. A miss escalates memory
 * pressure one level at a time through the reclaimer and retries, up to the
 * caller's ceiling.
 */

use super::{Heap, ReclaimContext};
use crate::core::limits::{align_up, ALIGNMENT};
use crate::core::types::Size;
use crate::memory::types::{MemoryError, MemoryPressure, MemoryResult};
use crate::monitoring::ReclaimSpan;
use std::alloc::Layout;
use std::ptr::NonNull;
use tracing::{error, trace, warn};

impl Heap {
    /// Allocate `size` bytes, terminating the process if the heap is exhausted
    ///
    /// Returns `None` only for `size == 0`. On exhaustion after reclaiming at
    /// every pressure level the failure goes through
    /// [`std::alloc::handle_alloc_error`].
    pub fn allocate(&mut self, size: Size) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }

        match self.allocate_with_pressure(size, MemoryPressure::Full) {
            Some(block) => Some(block),
            None => self.out_of_memory(size),
        }
    }

    /// Allocate `size` bytes, escalating at most to `HIGH` pressure
    ///
    /// Returns `None` for `size == 0` or when reclamation could not make room.
    pub fn allocate_or_null(&mut self, size: Size) -> Option<NonNull<u8>> {
        let block = self.allocate_with_pressure(size, MemoryPressure::High);

        if block.is_none() && size > 0 {
            warn!(
                size,
                allocated = self.core.accounting.allocated(),
                "Allocation failed after reclaiming at high pressure"
            );
        }
        block
    }

    /// Allocate `size` bytes, escalating through every pressure level
    pub fn try_allocate(&mut self, size: Size) -> MemoryResult<NonNull<u8>> {
        if size == 0 {
            return Err(MemoryError::ZeroSize);
        }

        self.allocate_with_pressure(size, MemoryPressure::Full)
            .ok_or(MemoryError::OutOfMemory {
                requested: size,
                allocated: self.core.accounting.allocated(),
                pressure: MemoryPressure::Full,
            })
    }

    /// The allocation loop with an explicit pressure ceiling
    ///
    /// The reclaimer is called at most once per level above `NONE` up to
    /// `max_pressure`; `NONE` never reclaims.
    pub fn allocate_with_pressure(
        &mut self,
        size: Size,
        max_pressure: MemoryPressure,
    ) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }

        if self.core.config.reclaim_before_each_alloc {
            self.reclaim(MemoryPressure::High);
        }

        if let Some(chunk) = self.core.pools.pop(size) {
            #[cfg(feature = "mem-stats")]
            self.core.stats.record_alloc(size);

            trace!(size, ptr = ?chunk, "Allocated from pool");
            return Some(chunk);
        }

        self.allocate_region(size, max_pressure)
    }

    fn allocate_region(&mut self, size: Size, max_pressure: MemoryPressure) -> Option<NonNull<u8>> {
        let aligned = align_up(size);

        let mut pressure = if self.core.config.reclaim_before_each_alloc {
            MemoryPressure::High
        } else if self.core.accounting.should_reclaim(size) {
            self.reclaim(MemoryPressure::Low);
            MemoryPressure::Low
        } else {
            MemoryPressure::None
        };

        loop {
            if let Some(block) = self.core.take_region(aligned) {
                #[cfg(feature = "mem-stats")]
                self.core.stats.record_alloc(size);

                trace!(size, aligned, ptr = ?block, pressure = %pressure, "Allocated region");
                return Some(block);
            }

            if pressure >= max_pressure {
                return None;
            }

            pressure = pressure.escalate()?;
            self.reclaim(pressure);
        }
    }

    /// Run the reclaimer once at `pressure`
    ///
    /// At `HIGH` and above the pool caches are drained afterwards so chunks
    /// the reclaimer released become visible to first-fit.
    pub(super) fn reclaim(&mut self, pressure: MemoryPressure) {
        let span = ReclaimSpan::new(pressure, self.core.accounting.allocated());

        {
            let _entered = span.enter();
            let mut context = ReclaimContext {
                core: &mut self.core,
            };
            self.reclaimer.reclaim(pressure, &mut context);

            if pressure >= MemoryPressure::High {
                self.core.drain_pools();
            }
        }

        span.finish(self.core.accounting.allocated());
    }

    /// Release a block
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this heap for a block of exactly
    /// `size` requested bytes (the size given to the allocating call, or the
    /// last `new_size` passed to a resize) and must not be used afterwards.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>, size: Size) {
        trace!(size, ptr = ?ptr, "Free");
        unsafe { self.core.free_block(ptr, size) }
    }

    /// Return every pooled chunk to the free list
    pub fn reclaim_pools(&mut self) -> usize {
        self.core.drain_pools()
    }

    /// Move free regions small enough for a pool class into the pools
    ///
    /// Walks the whole free list; meant for occasional use.
    pub fn defragment(&mut self) -> Size {
        self.core.defragment()
    }

    pub(super) fn out_of_memory(&self, size: Size) -> ! {
        error!(
            requested = size,
            allocated = self.core.accounting.allocated(),
            capacity = self.capacity(),
            "Heap exhausted at full pressure"
        );

        let layout = Layout::from_size_align(size, ALIGNMENT).unwrap_or(Layout::new::<u64>());
        std::alloc::handle_alloc_error(layout)
    }
}
