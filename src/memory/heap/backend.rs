/*!
 * Region Allocator Backends
 *
 * The orchestrator talks to whatever hands out raw aligned regions through
 * [`RegionAllocator`]. Arena mode uses the in-place free list; system mode
 * (feature `system-allocator`) forwards every region to the host allocator.
 * All sizes crossing this trait are already rounded to the alignment unit.
 */

use super::codec::PointerCodec;
use crate::core::types::Size;
use crate::memory::types::{FreeRegion, MemoryResult};
use std::ptr::NonNull;

/// Backend selected at compile time
#[cfg(not(feature = "system-allocator"))]
pub(crate) type Backend = super::free_list::FreeList;

#[cfg(feature = "system-allocator")]
pub(crate) type Backend = super::system::SystemHeap;

pub(crate) trait RegionAllocator {
    /// Take `size` bytes, or `None` when no region can hold them
    fn alloc_region(&mut self, size: Size) -> Option<NonNull<u8>>;

    /// Give a region back
    ///
    /// # Safety
    ///
    /// `ptr` must have come from this backend with exactly `size` bytes and
    /// must not be used afterwards.
    unsafe fn free_region(&mut self, ptr: NonNull<u8>, size: Size);

    /// Keep the first `new_size` bytes of a region and release the rest
    ///
    /// # Safety
    ///
    /// Same as [`RegionAllocator::free_region`] for `ptr` and `old_size`.
    unsafe fn shrink_region(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>>;

    /// Enlarge a region without going through `alloc_region`, preserving its
    /// first `payload` bytes. `None` leaves the region untouched.
    ///
    /// # Safety
    ///
    /// Same as [`RegionAllocator::free_region`] for `ptr` and `old_size`.
    unsafe fn grow_region(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
        payload: Size,
    ) -> Option<NonNull<u8>>;

    /// Move every free region of at most `max_size` bytes to `donate`
    fn defragment(&mut self, max_size: Size, donate: &mut dyn FnMut(NonNull<u8>, Size)) -> Size;

    fn contains(&self, ptr: NonNull<u8>) -> bool;

    /// Bytes under management, `0` when unbounded
    fn capacity(&self) -> Size;

    fn free_regions(&self) -> Vec<FreeRegion>;

    fn verify(&self) -> MemoryResult<()>;

    /// Compression for addresses this backend hands out, when it has one
    fn codec(&self) -> Option<&PointerCodec>;
}
