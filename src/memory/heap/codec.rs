/*!
 * Pointer Codec
 * Bijective mapping between arena addresses and 32-bit compressed pointers
 */

use crate::core::types::CompressedPointer;
use std::ptr::NonNull;

/// Compresses arena addresses into 32 bits
///
/// On targets whose addresses already fit in 32 bits the compressed form is
/// the address itself; elsewhere it is the distance from the arena base.
/// Decoding always goes through the base pointer so the result keeps the
/// arena's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerCodec {
    base: NonNull<u8>,
}

impl PointerCodec {
    pub fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    #[inline(always)]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Compress an address inside `[base, base + capacity]`
    #[inline(always)]
    pub fn encode(&self, ptr: NonNull<u8>) -> CompressedPointer {
        #[cfg(target_pointer_width = "32")]
        {
            ptr.as_ptr() as usize as CompressedPointer
        }
        #[cfg(not(target_pointer_width = "32"))]
        {
            self.index_of(ptr) as CompressedPointer
        }
    }

    /// Inverse of [`PointerCodec::encode`]
    #[inline(always)]
    pub fn decode(&self, compressed: CompressedPointer) -> NonNull<u8> {
        #[cfg(target_pointer_width = "32")]
        let index = compressed as usize - self.base.as_ptr() as usize;
        #[cfg(not(target_pointer_width = "32"))]
        let index = compressed as usize;

        // SAFETY: compressed pointers are only produced for addresses inside
        // the arena allocation, so the offset stays in bounds and non-null.
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(index)) }
    }

    /// [`PointerCodec::decode`] for values that may not come from this arena
    ///
    /// `None` unless `compressed` lies within `[base, base + capacity]`.
    pub fn decode_checked(&self, compressed: CompressedPointer, capacity: usize) -> Option<NonNull<u8>> {
        #[cfg(target_pointer_width = "32")]
        let index = (compressed as usize).checked_sub(self.base.as_ptr() as usize)?;
        #[cfg(not(target_pointer_width = "32"))]
        let index = compressed as usize;

        (index <= capacity).then(|| self.decode(compressed))
    }

    /// Distance of `ptr` from the arena base
    #[inline(always)]
    pub fn index_of(&self, ptr: NonNull<u8>) -> usize {
        ptr.as_ptr() as usize - self.base.as_ptr() as usize
    }

    /// Compressed form of the address `index` bytes past the base
    #[inline(always)]
    pub fn at_index(&self, index: usize) -> CompressedPointer {
        #[cfg(target_pointer_width = "32")]
        {
            (self.base.as_ptr() as usize + index) as CompressedPointer
        }
        #[cfg(not(target_pointer_width = "32"))]
        {
            index as CompressedPointer
        }
    }

    /// Arena index of a compressed pointer
    #[inline(always)]
    pub fn index_of_compressed(&self, compressed: CompressedPointer) -> usize {
        #[cfg(target_pointer_width = "32")]
        {
            compressed as usize - self.base.as_ptr() as usize
        }
        #[cfg(not(target_pointer_width = "32"))]
        {
            compressed as usize
        }
    }
}
