/*!
 * Runtime Heap
 *
 * Fixed-arena allocator for a single-threaded language runtime.
 *
 * ## Layers
 *
 * - **Pool cache**: LIFO lists of 8..=`N*8` byte chunks, checked first
 * - **Region allocator**: address-ordered first-fit free list living inside
 *   the arena (or the host allocator with feature `system-allocator`)
 * - **Orchestrator**: retries failed allocations while escalating memory
 *   pressure through the injected [`Reclaimer`]
 *
 * ## Features
 *
 * - **Coalescing**: no two free regions are ever left adjacent
 * - **Pointer compression**: every arena address fits in 32 bits
 * - **In-place resize**: growth into the neighbouring free region before
 *   falling back to allocate and copy
 * - **Reclamation budget**: large requests reclaim proactively at low pressure
 * - **Statistics**: byte and waste peaks (feature `mem-stats`)
 */

mod accounting;
mod allocator;
#[cfg_attr(feature = "system-allocator", allow(dead_code))]
mod arena;
mod backend;
mod codec;
#[cfg_attr(feature = "system-allocator", allow(dead_code))]
mod free_list;
mod pools;
mod resize;
#[cfg_attr(not(feature = "system-allocator"), allow(dead_code))]
mod system;

pub use codec::PointerCodec;

use super::config::HeapConfig;
#[cfg(feature = "mem-stats")]
use super::stats::{HeapStats, StatsCollector};
use super::traits::{NoReclaim, Reclaimer};
use super::types::{FreeRegion, MemoryError, MemoryResult};
#[cfg(feature = "mem-stats")]
use super::types::MemoryCategory;
use crate::core::limits::align_up;
use crate::core::types::{CompressedPointer, Size};
use accounting::Accounting;
use backend::{Backend, RegionAllocator};
use pools::PoolCache;
use std::ptr::NonNull;
use tracing::{debug, error, info};

/// One allocator instance: arena, caches, accounting and its reclaimer
///
/// Instances share nothing, so several isolated runtimes can each own one.
/// The heap is neither `Send` nor `Sync`.
pub struct Heap {
    core: HeapCore,
    reclaimer: Box<dyn Reclaimer>,
}

/// Everything except the reclaimer, so the reclaimer can be handed a
/// mutable view of the rest while it runs
pub(crate) struct HeapCore {
    backend: Backend,
    pools: PoolCache,
    accounting: Accounting,
    config: HeapConfig,
    #[cfg(feature = "mem-stats")]
    stats: StatsCollector,
}

impl Heap {
    /// Heap without a collector; exhaustion is reported immediately
    pub fn new(config: HeapConfig) -> MemoryResult<Self> {
        Self::with_reclaimer(config, NoReclaim)
    }

    pub fn with_reclaimer<R>(config: HeapConfig, reclaimer: R) -> MemoryResult<Self>
    where
        R: Reclaimer + 'static,
    {
        config.validate()?;

        let backend = Self::init_backend(&config)?;
        let heap = Self {
            core: HeapCore {
                pools: PoolCache::new(config.pool_classes),
                accounting: Accounting::new(config.effective_gc_limit()),
                #[cfg(feature = "mem-stats")]
                stats: StatsCollector::new(backend.capacity()),
                backend,
                config,
            },
            reclaimer: Box::new(reclaimer),
        };

        info!(
            capacity = heap.core.backend.capacity(),
            pool_classes = heap.core.config.pool_classes,
            gc_limit = heap.core.accounting.gc_limit(),
            "Heap initialized"
        );

        Ok(heap)
    }

    #[cfg(not(feature = "system-allocator"))]
    fn init_backend(config: &HeapConfig) -> MemoryResult<Backend> {
        let arena = arena::Arena::new(config.capacity)?;
        Ok(free_list::FreeList::new(arena))
    }

    #[cfg(feature = "system-allocator")]
    fn init_backend(_config: &HeapConfig) -> MemoryResult<Backend> {
        Ok(system::SystemHeap::new())
    }

    /// Tear the heap down, draining the pools first
    ///
    /// Fails with [`MemoryError::Leaked`] if any block is still allocated.
    pub fn finalize(mut self) -> MemoryResult<()> {
        self.core.drain_pools();

        let leaked = self.core.accounting.allocated();
        if leaked != 0 {
            error!(bytes = leaked, "Heap finalized with live allocations");
            return Err(MemoryError::Leaked { bytes: leaked });
        }

        info!("Heap finalized");
        Ok(())
    }

    pub fn config(&self) -> &HeapConfig {
        &self.core.config
    }

    /// Arena size in bytes, `0` in system mode
    pub fn capacity(&self) -> Size {
        self.core.backend.capacity()
    }

    /// Bytes outside the free list, pooled chunks included
    pub fn allocated_bytes(&self) -> Size {
        self.core.accounting.allocated()
    }

    /// Remaining reclamation budget before a proactive reclaim
    pub fn reclaim_budget(&self) -> Size {
        self.core.accounting.gc_limit()
    }

    /// Cached chunk count per pool class
    pub fn pooled_chunks(&self) -> Vec<usize> {
        self.core.pools.counts().to_vec()
    }

    /// Free list snapshot in address order
    pub fn free_regions(&self) -> Vec<FreeRegion> {
        self.core.backend.free_regions()
    }

    /// Walk the free list and check every structural invariant
    pub fn verify(&self) -> MemoryResult<()> {
        self.core.backend.verify()
    }

    /// Whether `ptr` points into the arena, end address included
    ///
    /// Always true in system mode.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.core.backend.contains(ptr)
    }

    /// 32-bit form of an arena address
    ///
    /// `None` for addresses outside the arena and in system mode.
    pub fn compress_pointer(&self, ptr: NonNull<u8>) -> Option<CompressedPointer> {
        let codec = self.core.backend.codec()?;
        self.contains(ptr).then(|| codec.encode(ptr))
    }

    /// Arena-relative offset of `ptr`, matching [`FreeRegion::offset`]
    pub fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let codec = self.core.backend.codec()?;
        self.contains(ptr).then(|| codec.index_of(ptr))
    }

    /// Inverse of [`Heap::compress_pointer`]
    pub fn decompress_pointer(&self, compressed: CompressedPointer) -> Option<NonNull<u8>> {
        let codec = self.core.backend.codec()?;
        codec.decode_checked(compressed, self.capacity())
    }

    #[cfg(feature = "mem-stats")]
    pub fn stats(&self) -> HeapStats {
        self.core.stats.snapshot()
    }

    #[cfg(feature = "mem-stats")]
    pub fn record_category_alloc(&mut self, category: MemoryCategory, size: Size) {
        self.core.stats.record_category_alloc(category, size);
    }

    #[cfg(feature = "mem-stats")]
    pub fn record_category_free(&mut self, category: MemoryCategory, size: Size) {
        self.core.stats.record_category_free(category, size);
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("capacity", &self.capacity())
            .field("allocated", &self.allocated_bytes())
            .field("reclaim_budget", &self.reclaim_budget())
            .field("pooled_chunks", &self.core.pools.counts())
            .finish()
    }
}

impl HeapCore {
    /// Take `size` aligned bytes from the region allocator
    fn take_region(&mut self, size: Size) -> Option<NonNull<u8>> {
        let block = self.backend.alloc_region(size)?;
        self.accounting.on_take(size);
        Some(block)
    }

    /// Release a caller block, to the pools when it fits a class
    unsafe fn free_block(&mut self, ptr: NonNull<u8>, size: Size) {
        debug_assert!(size > 0, "freeing a zero-sized block");
        debug_assert!(self.backend.contains(ptr), "{ptr:p} is not a heap pointer");

        #[cfg(feature = "mem-stats")]
        self.stats.record_free(size);

        if size <= self.pools.max_size() {
            unsafe { self.pools.push(ptr, size) };
            return;
        }

        let aligned = align_up(size);
        unsafe { self.backend.free_region(ptr, aligned) };
        self.accounting.on_release(aligned);
    }

    /// Shrink a caller block, `None` if the backend could not
    unsafe fn shrink_block(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>> {
        let old_aligned = align_up(old_size);
        let new_aligned = align_up(new_size);
        debug_assert!(new_aligned <= old_aligned);

        let block = if new_aligned == old_aligned {
            ptr
        } else {
            let block = unsafe { self.backend.shrink_region(ptr, old_aligned, new_aligned)? };
            self.accounting.on_release(old_aligned - new_aligned);
            block
        };

        #[cfg(feature = "mem-stats")]
        {
            self.stats.record_free(old_size);
            self.stats.record_alloc(new_size);
        }

        Some(block)
    }

    /// Return every pooled chunk to the region allocator
    fn drain_pools(&mut self) -> usize {
        let backend = &mut self.backend;
        let accounting = &mut self.accounting;

        let drained = self.pools.drain(|chunk, size| {
            // SAFETY: pooled chunks are whole regions of their class size.
            unsafe { backend.free_region(chunk, size) };
            accounting.on_release(size);
        });

        if drained > 0 {
            debug!(chunks = drained, "Drained pool caches");
        }
        drained
    }

    /// Move small free regions into the pools
    fn defragment(&mut self) -> Size {
        let pools = &mut self.pools;
        let max_size = pools.max_size();

        let moved = self.backend.defragment(max_size, &mut |chunk: NonNull<u8>, size: Size| {
            // SAFETY: the region was just unlinked from the free list.
            unsafe { pools.push(chunk, size) };
        });
        // Pooled chunks count as allocated until drained.
        self.accounting.on_pooled(moved);

        debug!(bytes = moved, "Defragmented free list");
        moved
    }
}

impl Drop for HeapCore {
    fn drop(&mut self) {
        self.drain_pools();
    }
}

/// What a [`Reclaimer`] may do to the heap while it runs
///
/// Allocation and growth are not reachable from here, so a reclaimer can
/// never re-enter the allocation path that called it.
pub struct ReclaimContext<'a> {
    core: &'a mut HeapCore,
}

impl ReclaimContext<'_> {
    /// Release an unreachable block
    ///
    /// # Safety
    ///
    /// Same contract as [`Heap::free`].
    pub unsafe fn free(&mut self, ptr: NonNull<u8>, size: Size) {
        unsafe { self.core.free_block(ptr, size) }
    }

    /// Shrink a block in place, keeping its first `new_size` bytes
    ///
    /// Returns the block's address afterwards, or `None` if it was left as is.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block of `old_size` bytes from this heap, and
    /// `new_size` must be non-zero and not larger than `old_size`.
    pub unsafe fn shrink(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>> {
        if new_size == 0 || new_size > old_size {
            return None;
        }
        unsafe { self.core.shrink_block(ptr, old_size, new_size) }
    }

    /// Return all pooled chunks to the free list
    pub fn reclaim_pools(&mut self) -> usize {
        self.core.drain_pools()
    }

    /// Move small free regions into the pools
    pub fn defragment(&mut self) -> Size {
        self.core.defragment()
    }

    pub fn allocated_bytes(&self) -> Size {
        self.core.accounting.allocated()
    }
}
