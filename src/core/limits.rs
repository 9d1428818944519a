/*!
 * Heap Limits and Constants
 *
 * Centralized location for the allocator's layout constants and default
 * thresholds. Grouped by concern so the arena, pool and budget settings can be
 * found in one place.
 */

// =============================================================================
// LAYOUT
// =============================================================================

/// Log2 of the alignment unit
pub const ALIGNMENT_LOG: u32 = 3;

/// Alignment unit (8 bytes)
/// Every block size is rounded up to a multiple of this, and every returned
/// pointer is aligned to it
pub const ALIGNMENT: usize = 1 << ALIGNMENT_LOG;

/// Size of the in-place free region header: `size: u32` then `next_offset: u32`
pub const FREE_HEADER_SIZE: usize = 8;

/// Byte offset of the `size` field inside a free region header
pub const FREE_HEADER_SIZE_FIELD: usize = 0;

/// Byte offset of the `next_offset` field inside a free region header
pub const FREE_HEADER_NEXT_FIELD: usize = 4;

/// End-of-list marker for compressed `next_offset` links
pub const END_OF_LIST: u32 = u32::MAX;

// The smallest block must be able to hold a free header or a pool link.
const _: () = assert!(ALIGNMENT >= FREE_HEADER_SIZE);
const _: () = assert!(ALIGNMENT >= std::mem::size_of::<usize>());

// =============================================================================
// ARENA
// =============================================================================

/// Default arena capacity (512KB)
pub const DEFAULT_HEAP_SIZE: usize = 512 * 1024;

/// Largest arena that still compresses every offset into 32 bits
/// The top aligned unit is left out so `END_OF_LIST` can never be an address
pub const MAX_HEAP_SIZE: usize = (u32::MAX as usize) - ALIGNMENT + 1;

// =============================================================================
// POOLS
// =============================================================================

/// Default number of pool size classes (8, 16, 24 and 32 byte chunks)
pub const DEFAULT_POOL_CLASSES: usize = 4;

/// Upper bound on configurable pool size classes
pub const MAX_POOL_CLASSES: usize = 64;

// =============================================================================
// RECLAMATION BUDGET
// =============================================================================

/// Ceiling of the derived reclamation budget step (8KB)
pub const MAX_GC_LIMIT: usize = 8 * 1024;

/// The derived budget step is `capacity / GC_LIMIT_DIVISOR`, capped at `MAX_GC_LIMIT`
pub const GC_LIMIT_DIVISOR: usize = 32;

/// Largest aligned size; no arena or host allocation can ever satisfy it
pub const MAX_ALIGNED_SIZE: usize = usize::MAX & !(ALIGNMENT - 1);

/// Round `size` up to the alignment unit
///
/// Saturates at [`MAX_ALIGNED_SIZE`], so an oversized request stays
/// oversized instead of wrapping to a small block.
#[inline(always)]
pub const fn align_up(size: usize) -> usize {
    match size.checked_add(ALIGNMENT - 1) {
        Some(padded) => padded & !(ALIGNMENT - 1),
        None => MAX_ALIGNED_SIZE,
    }
}
