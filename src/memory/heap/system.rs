/*!
 * System Backend
 * Regions straight from the host allocator
 */

use super::backend::RegionAllocator;
use super::codec::PointerCodec;
use crate::core::limits::ALIGNMENT;
use crate::core::types::Size;
use crate::memory::types::{FreeRegion, MemoryResult};
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Forwards every region to `std::alloc`
///
/// There is no free list here, so defragmentation and verification have
/// nothing to do and every address counts as belonging to the heap.
#[derive(Debug, Default)]
pub(crate) struct SystemHeap;

impl SystemHeap {
    pub fn new() -> Self {
        Self
    }

    #[inline(always)]
    fn layout(size: Size) -> Option<Layout> {
        Layout::from_size_align(size, ALIGNMENT).ok()
    }
}

impl RegionAllocator for SystemHeap {
    fn alloc_region(&mut self, size: Size) -> Option<NonNull<u8>> {
        let layout = Self::layout(size)?;
        // SAFETY: sizes reaching the backend are non-zero.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn free_region(&mut self, ptr: NonNull<u8>, size: Size) {
        if let Some(layout) = Self::layout(size) {
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
        }
    }

    unsafe fn shrink_region(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>> {
        let layout = Self::layout(old_size)?;
        NonNull::new(unsafe { alloc::realloc(ptr.as_ptr(), layout, new_size) })
    }

    unsafe fn grow_region(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
        _payload: Size,
    ) -> Option<NonNull<u8>> {
        let layout = Self::layout(old_size)?;
        Self::layout(new_size)?;
        NonNull::new(unsafe { alloc::realloc(ptr.as_ptr(), layout, new_size) })
    }

    fn defragment(&mut self, _max_size: Size, _donate: &mut dyn FnMut(NonNull<u8>, Size)) -> Size {
        0
    }

    fn contains(&self, _ptr: NonNull<u8>) -> bool {
        true
    }

    fn capacity(&self) -> Size {
        0
    }

    fn free_regions(&self) -> Vec<FreeRegion> {
        Vec::new()
    }

    fn verify(&self) -> MemoryResult<()> {
        Ok(())
    }

    fn codec(&self) -> Option<&PointerCodec> {
        None
    }
}
