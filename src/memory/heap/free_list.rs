/*!
 * Address-Ordered Free List
 *
 * Free regions are threaded through the arena itself. Each region starts with
 * an 8 byte header written in place:
 *
 * ```text
 * +----------------+----------------------+----------------------+
 * | size: u32      | next_offset: u32     |    unused payload    |
 * +----------------+----------------------+----------------------+
 *   field 0          field 4 (compressed)
 * ```
 *
 * Regions are linked in strictly increasing address order behind a sentinel
 * head with size zero, which never lies in the arena and is never adjacent to
 * anything. No two regions in the list are ever physically adjacent: every
 * insertion merges with its neighbours when they touch.
 *
 * A skip cursor remembers the last position touched so repeated frees near
 * the same address do not rescan from the head. It is only a starting hint;
 * the walk is correct from any list node that precedes the target.
 */

use super::arena::Arena;
use super::backend::RegionAllocator;
use super::codec::PointerCodec;
use crate::core::limits::{ALIGNMENT, END_OF_LIST, FREE_HEADER_NEXT_FIELD, FREE_HEADER_SIZE_FIELD};
use crate::core::types::{CompressedPointer, Size};
use crate::memory::types::{FreeRegion, MemoryError, MemoryResult};
use std::ptr::NonNull;

/// A position in the free list
///
/// `Head` orders before every region, matching its role as the node that
/// precedes the first real region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Cursor {
    Head,
    Region(CompressedPointer),
}

pub(crate) struct FreeList {
    arena: Arena,
    /// `next_offset` of the sentinel head
    head_next: CompressedPointer,
    skip: Cursor,
}

impl FreeList {
    /// A list holding one region that spans the whole arena
    pub fn new(mut arena: Arena) -> Self {
        let first = arena.codec().at_index(0);
        let capacity = arena.capacity() as u32;
        arena.write_u32(first, FREE_HEADER_SIZE_FIELD, capacity);
        arena.write_u32(first, FREE_HEADER_NEXT_FIELD, END_OF_LIST);

        Self {
            arena,
            head_next: first,
            skip: Cursor::Head,
        }
    }

    #[cfg(test)]
    pub fn skip(&self) -> Cursor {
        self.skip
    }

    #[inline(always)]
    fn region_size(&self, at: CompressedPointer) -> Size {
        self.arena.read_u32(at, FREE_HEADER_SIZE_FIELD) as Size
    }

    #[inline(always)]
    fn set_region_size(&mut self, at: CompressedPointer, size: Size) {
        debug_assert_eq!(size % ALIGNMENT, 0);
        self.arena.write_u32(at, FREE_HEADER_SIZE_FIELD, size as u32);
    }

    #[inline(always)]
    fn next_of(&self, cursor: Cursor) -> CompressedPointer {
        match cursor {
            Cursor::Head => self.head_next,
            Cursor::Region(at) => self.arena.read_u32(at, FREE_HEADER_NEXT_FIELD),
        }
    }

    #[inline(always)]
    fn set_next(&mut self, cursor: Cursor, next: CompressedPointer) {
        match cursor {
            Cursor::Head => self.head_next = next,
            Cursor::Region(at) => self.arena.write_u32(at, FREE_HEADER_NEXT_FIELD, next),
        }
    }

    /// Address one past the end of the region at `cursor`; the head has none
    #[inline(always)]
    fn end_of(&self, cursor: Cursor) -> Option<CompressedPointer> {
        match cursor {
            Cursor::Head => None,
            Cursor::Region(at) => Some(at + self.region_size(at) as u32),
        }
    }

    #[inline(always)]
    fn write_region(&mut self, at: CompressedPointer, size: Size, next: CompressedPointer) {
        self.set_region_size(at, size);
        self.set_next(Cursor::Region(at), next);
    }

    /// The list node immediately preceding `block`'s address
    pub fn find_prev(&mut self, block: CompressedPointer) -> Cursor {
        let mut prev = if Cursor::Region(block) > self.skip {
            self.skip
        } else {
            Cursor::Head
        };

        loop {
            let next = self.next_of(prev);
            if next >= block {
                break;
            }
            prev = Cursor::Region(next);
        }

        self.skip = prev;
        prev
    }

    /// First-fit allocation of `size` aligned bytes
    pub fn allocate(&mut self, size: Size) -> Option<CompressedPointer> {
        debug_assert!(size > 0 && size % ALIGNMENT == 0);

        let mut prev = Cursor::Head;
        let mut current = self.head_next;

        while current != END_OF_LIST {
            let current_size = self.region_size(current);
            let next = self.next_of(Cursor::Region(current));

            if current_size >= size {
                if current_size > size {
                    let remaining = current + size as u32;
                    self.write_region(remaining, current_size - size, next);
                    self.set_next(prev, remaining);
                } else {
                    self.set_next(prev, next);
                }

                self.skip = prev;
                return Some(current);
            }

            prev = Cursor::Region(current);
            current = next;
        }

        None
    }

    /// Link `size` bytes at `block` after `prev`, merging with whichever
    /// neighbours touch it
    pub fn insert(&mut self, block: CompressedPointer, prev: Cursor, size: Size) {
        debug_assert!(size > 0 && size % ALIGNMENT == 0);
        debug_assert_ne!(self.skip, Cursor::Region(block));
        debug_assert!(Cursor::Region(block) > prev);

        let next = self.next_of(prev);
        debug_assert!(block < next, "block 0x{block:x} is already free");

        let merged = match prev {
            Cursor::Region(prev_at) if self.end_of(prev) == Some(block) => {
                let prev_size = self.region_size(prev_at);
                self.set_region_size(prev_at, prev_size + size);
                prev_at
            }
            _ => {
                self.set_region_size(block, size);
                self.set_next(prev, block);
                block
            }
        };

        let merged_end = merged + self.region_size(merged) as u32;
        if next != END_OF_LIST && merged_end == next {
            debug_assert_ne!(self.skip, Cursor::Region(next));

            let size = self.region_size(merged) + self.region_size(next);
            let after = self.next_of(Cursor::Region(next));
            self.write_region(merged, size, after);
        } else {
            self.set_next(Cursor::Region(merged), next);
        }
    }

    /// Return a block to the list
    pub fn release(&mut self, block: CompressedPointer, size: Size) {
        let prev = self.find_prev(block);
        self.insert(block, prev, size);
    }

    /// Give the tail of a block back, keeping its first `new_size` bytes
    pub fn shrink(&mut self, block: CompressedPointer, old_size: Size, new_size: Size) {
        debug_assert!(new_size < old_size);

        let prev = self.find_prev(block);
        self.insert(block + new_size as u32, prev, old_size - new_size);
    }

    /// Grow a block without a full reallocation
    ///
    /// Consumes a prefix of the free region directly after the block if it is
    /// large enough. Otherwise takes the tail of the region directly before it
    /// and moves the first `payload` bytes down. Returns the block's start
    /// afterwards, or `None` when neither neighbour can cover the growth.
    pub fn grow(
        &mut self,
        block: CompressedPointer,
        old_size: Size,
        new_size: Size,
        payload: Size,
    ) -> Option<CompressedPointer> {
        debug_assert!(new_size > old_size);
        let required = new_size - old_size;

        let prev = self.find_prev(block);
        let next = self.next_of(prev);

        if next != END_OF_LIST && block + old_size as u32 == next {
            let next_size = self.region_size(next);

            if required <= next_size {
                let after = self.next_of(Cursor::Region(next));

                if required == next_size {
                    self.set_next(prev, after);
                } else {
                    let remaining = next + required as u32;
                    self.write_region(remaining, next_size - required, after);
                    self.set_next(prev, remaining);
                }

                return Some(block);
            }
        }

        if let Cursor::Region(prev_at) = prev {
            if self.end_of(prev) == Some(block) {
                let prev_size = self.region_size(prev_at);

                if required <= prev_size {
                    if required == prev_size {
                        let before = self.find_prev(prev_at);
                        self.set_next(before, next);
                    } else {
                        self.set_region_size(prev_at, prev_size - required);
                    }

                    let moved = block - required as u32;
                    self.arena.copy(block, moved, payload);
                    return Some(moved);
                }
            }
        }

        None
    }

    /// Snapshot of every region in list order
    pub fn regions(&self) -> Vec<FreeRegion> {
        let mut regions = Vec::new();
        let mut current = self.head_next;

        while current != END_OF_LIST {
            regions.push(FreeRegion {
                offset: self.arena.codec().index_of_compressed(current),
                size: self.region_size(current),
            });
            current = self.next_of(Cursor::Region(current));
        }

        regions
    }
}

impl RegionAllocator for FreeList {
    fn alloc_region(&mut self, size: Size) -> Option<NonNull<u8>> {
        let block = self.allocate(size)?;
        Some(self.arena.codec().decode(block))
    }

    unsafe fn free_region(&mut self, ptr: NonNull<u8>, size: Size) {
        debug_assert!(self.arena.contains(ptr));
        let block = self.arena.codec().encode(ptr);
        self.release(block, size);
    }

    unsafe fn shrink_region(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>> {
        let block = self.arena.codec().encode(ptr);
        self.shrink(block, old_size, new_size);
        Some(ptr)
    }

    unsafe fn grow_region(
        &mut self,
        ptr: NonNull<u8>,
        old_size: Size,
        new_size: Size,
        payload: Size,
    ) -> Option<NonNull<u8>> {
        let block = self.arena.codec().encode(ptr);
        let grown = self.grow(block, old_size, new_size, payload)?;
        Some(self.arena.codec().decode(grown))
    }

    /// Unlink every region of at most `max_size` bytes and hand it to `donate`
    ///
    /// Returns the number of bytes taken out of the list.
    fn defragment(&mut self, max_size: Size, donate: &mut dyn FnMut(NonNull<u8>, Size)) -> Size {
        let mut moved = 0;
        let mut prev = Cursor::Head;
        let mut current = self.head_next;

        while current != END_OF_LIST {
            let next = self.next_of(Cursor::Region(current));
            let size = self.region_size(current);

            if size <= max_size {
                self.set_next(prev, next);
                donate(self.arena.codec().decode(current), size);
                moved += size;
            } else {
                prev = Cursor::Region(current);
            }

            current = next;
        }

        self.skip = Cursor::Head;
        moved
    }

    fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.arena.contains(ptr)
    }

    fn capacity(&self) -> Size {
        self.arena.capacity()
    }

    fn free_regions(&self) -> Vec<FreeRegion> {
        self.regions()
    }

    /// Walk the whole list and check ordering, alignment, bounds and coalescing
    fn verify(&self) -> MemoryResult<()> {
        let capacity = self.arena.capacity();
        let mut previous_end: Option<usize> = None;
        let mut current = self.head_next;
        let mut skip_seen = self.skip == Cursor::Head;

        while current != END_OF_LIST {
            let offset = self.arena.codec().index_of_compressed(current);
            if offset >= capacity {
                return Err(corruption(offset, "region starts outside the arena"));
            }

            let size = self.region_size(current);
            if offset % ALIGNMENT != 0 || size == 0 || size % ALIGNMENT != 0 {
                return Err(corruption(offset, format!("misaligned region of {size} bytes")));
            }
            if offset + size > capacity {
                return Err(corruption(offset, "region runs past the arena end"));
            }

            match previous_end {
                Some(end) if offset < end => {
                    return Err(corruption(offset, "regions overlap or are out of order"))
                }
                Some(end) if offset == end => {
                    return Err(corruption(offset, "adjacent free regions left unmerged"))
                }
                _ => {}
            }

            skip_seen |= self.skip == Cursor::Region(current);
            previous_end = Some(offset + size);
            current = self.next_of(Cursor::Region(current));
        }

        if !skip_seen {
            return Err(corruption(0, "skip cursor points outside the list"));
        }

        Ok(())
    }

    fn codec(&self) -> Option<&PointerCodec> {
        Some(self.arena.codec())
    }
}

fn corruption(offset: usize, reason: impl Into<String>) -> MemoryError {
    MemoryError::CorruptionDetected {
        offset,
        reason: reason.into(),
    }
}
