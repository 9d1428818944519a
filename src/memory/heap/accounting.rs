/*!
 * Heap Accounting
 * Allocated byte count and the proactive reclamation budget
 */

use crate::core::types::Size;

/// Tracks bytes held outside the free list and the reclamation budget
///
/// The budget (`gc_limit`) counts down as blocks are taken from the region
/// allocator and back up as they are released, always staying within one
/// `step`. A request at least as large as the remaining budget triggers a
/// proactive low-pressure reclaim before it is attempted.
#[derive(Debug, Clone)]
pub(crate) struct Accounting {
    allocated: Size,
    gc_limit: Size,
    step: Size,
}

impl Accounting {
    pub fn new(step: Size) -> Self {
        debug_assert!(step > 0);
        Self {
            allocated: 0,
            gc_limit: step,
            step,
        }
    }

    #[inline(always)]
    pub fn allocated(&self) -> Size {
        self.allocated
    }

    #[inline(always)]
    pub fn gc_limit(&self) -> Size {
        self.gc_limit
    }

    /// Whether a request of `size` bytes should reclaim before its first attempt
    #[inline(always)]
    pub fn should_reclaim(&self, size: Size) -> bool {
        size >= self.gc_limit
    }

    /// `size` aligned bytes left the region allocator
    pub fn on_take(&mut self, size: Size) {
        let mut limit = self.gc_limit;
        while limit < size {
            limit += self.step;
        }
        self.gc_limit = limit - size;
        self.allocated += size;
    }

    /// Free-list bytes moved into the pools; they stay out of the budget
    pub fn on_pooled(&mut self, size: Size) {
        self.allocated += size;
    }

    /// `size` aligned bytes went back to the region allocator
    pub fn on_release(&mut self, size: Size) {
        debug_assert!(
            self.allocated >= size,
            "released {size} bytes with only {} allocated",
            self.allocated
        );
        self.allocated -= size;

        let mut limit = self.gc_limit + size;
        while limit > self.step {
            limit -= self.step;
        }
        self.gc_limit = limit;
    }
}
