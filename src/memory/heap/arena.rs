/*!
 * Arena
 * The fixed-size, aligned byte region backing every block
 */

use super::codec::PointerCodec;
use crate::core::limits::{ALIGNMENT, FREE_HEADER_SIZE};
use crate::core::types::{CompressedPointer, Size};
use crate::memory::types::{MemoryError, MemoryResult};
use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};

/// Owns the arena bytes and gives word-level access to in-place headers
///
/// Header fields are read and written through explicit byte offsets rather
/// than typed overlays, so free metadata and caller payload never alias as
/// Rust values.
pub(crate) struct Arena {
    base: NonNull<u8>,
    layout: Layout,
    codec: PointerCodec,
}

impl Arena {
    pub fn new(capacity: Size) -> MemoryResult<Self> {
        let layout = Layout::from_size_align(capacity, ALIGNMENT)
            .map_err(|e| MemoryError::InvalidConfig(e.to_string()))?;

        // SAFETY: capacity was validated non-zero by the config.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(raw).ok_or(MemoryError::ArenaUnavailable { capacity })?;

        Ok(Self {
            base,
            layout,
            codec: PointerCodec::new(base),
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> Size {
        self.layout.size()
    }

    #[inline(always)]
    pub fn codec(&self) -> &PointerCodec {
        &self.codec
    }

    /// Whether `ptr` lies within the arena, end address included
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let start = self.base.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        addr >= start && addr <= start + self.capacity()
    }

    /// Read the `u32` at `field` bytes past the region `at`
    #[inline(always)]
    pub fn read_u32(&self, at: CompressedPointer, field: usize) -> u32 {
        let index = self.checked_index(at, field);
        // SAFETY: index + 4 is within the allocation and 4-aligned.
        unsafe { self.base.as_ptr().add(index).cast::<u32>().read() }
    }

    #[inline(always)]
    pub fn write_u32(&mut self, at: CompressedPointer, field: usize, value: u32) {
        let index = self.checked_index(at, field);
        // SAFETY: index + 4 is within the allocation and 4-aligned.
        unsafe { self.base.as_ptr().add(index).cast::<u32>().write(value) }
    }

    /// `memmove` of `len` bytes inside the arena
    pub fn copy(&mut self, from: CompressedPointer, to: CompressedPointer, len: Size) {
        let src = self.codec.index_of_compressed(from);
        let dst = self.codec.index_of_compressed(to);
        assert!(src + len <= self.capacity() && dst + len <= self.capacity());

        // SAFETY: both ranges were bounds checked above; ptr::copy allows overlap.
        unsafe {
            ptr::copy(
                self.base.as_ptr().add(src),
                self.base.as_ptr().add(dst),
                len,
            );
        }
    }

    #[inline(always)]
    fn checked_index(&self, at: CompressedPointer, field: usize) -> usize {
        let index = self.codec.index_of_compressed(at) + field;
        debug_assert_eq!(index % 4, 0, "unaligned header access at {index}");
        assert!(
            index + 4 <= self.capacity() && field + 4 <= FREE_HEADER_SIZE,
            "header access outside the arena at {index}"
        );
        index
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: base was allocated with exactly this layout in `new`.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}
