/*!
 * Pool Cache
 * Per-size-class LIFO lists of small chunks in front of the region allocator
 */

use crate::core::limits::{ALIGNMENT, ALIGNMENT_LOG};
use crate::core::types::Size;
use std::ptr::{self, NonNull};

/// Singly linked chunk lists, one per size class
///
/// Class `i` holds chunks of exactly `(i + 1) * ALIGNMENT` bytes. The link to
/// the next chunk is stored in the first word of each free chunk, so the cache
/// owns no storage besides its list heads.
#[derive(Debug)]
pub(crate) struct PoolCache {
    heads: Vec<Option<NonNull<u8>>>,
    counts: Vec<usize>,
}

impl PoolCache {
    pub fn new(classes: usize) -> Self {
        Self {
            heads: vec![None; classes],
            counts: vec![0; classes],
        }
    }

    /// Largest request the cache can serve
    #[inline(always)]
    pub fn max_size(&self) -> Size {
        self.heads.len() * ALIGNMENT
    }

    /// Size class for `size`, or `None` above [`PoolCache::max_size`]
    #[inline(always)]
    pub fn class_of(&self, size: Size) -> Option<usize> {
        if size == 0 || size > self.max_size() {
            None
        } else {
            Some((size - 1) >> ALIGNMENT_LOG)
        }
    }

    #[inline(always)]
    pub fn chunk_size(class: usize) -> Size {
        (class + 1) * ALIGNMENT
    }

    /// Pop the most recently pushed chunk of `size`'s class
    pub fn pop(&mut self, size: Size) -> Option<NonNull<u8>> {
        let class = self.class_of(size)?;
        let chunk = self.heads[class]?;

        // SAFETY: every chunk in the list was pushed with a valid link word.
        self.heads[class] = unsafe { read_link(chunk) };
        self.counts[class] -= 1;
        Some(chunk)
    }

    /// Push a chunk onto its class list
    ///
    /// # Safety
    ///
    /// `chunk` must be an `ALIGNMENT`-aligned block of at least
    /// `align_up(size)` bytes that the caller no longer uses, and `size` must
    /// not exceed [`PoolCache::max_size`].
    pub unsafe fn push(&mut self, chunk: NonNull<u8>, size: Size) {
        let Some(class) = self.class_of(size) else {
            debug_assert!(false, "{size} bytes is above the pool range");
            return;
        };
        debug_assert_eq!(chunk.as_ptr() as usize % ALIGNMENT, 0);

        // SAFETY: the chunk is free, aligned, and at least one word long.
        unsafe { write_link(chunk, self.heads[class]) };
        self.heads[class] = Some(chunk);
        self.counts[class] += 1;
    }

    /// Empty every class, passing each chunk and its class size to `release`
    pub fn drain(&mut self, mut release: impl FnMut(NonNull<u8>, Size)) -> usize {
        let mut drained = 0;

        for class in 0..self.heads.len() {
            let size = Self::chunk_size(class);
            let mut current = self.heads[class].take();

            while let Some(chunk) = current {
                // SAFETY: read before the chunk is handed back.
                current = unsafe { read_link(chunk) };
                release(chunk, size);
                drained += 1;
            }

            self.counts[class] = 0;
        }

        drained
    }

    /// Chunk count per class
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Bytes parked in the cache
    #[cfg(test)]
    pub fn bytes(&self) -> Size {
        self.counts
            .iter()
            .enumerate()
            .map(|(class, count)| count * Self::chunk_size(class))
            .sum()
    }
}

#[inline(always)]
unsafe fn read_link(chunk: NonNull<u8>) -> Option<NonNull<u8>> {
    NonNull::new(unsafe { ptr::read(chunk.as_ptr().cast::<*mut u8>()) })
}

#[inline(always)]
unsafe fn write_link(chunk: NonNull<u8>, next: Option<NonNull<u8>>) {
    let next = next.map_or(ptr::null_mut(), NonNull::as_ptr);
    unsafe { ptr::write(chunk.as_ptr().cast::<*mut u8>(), next) }
}
