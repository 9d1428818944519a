/*!
 * Core Types
 * Common types used across the heap
 */

/// Size type for memory operations
pub type Size = usize;

/// 32-bit compressed pointer into the arena
pub type CompressedPointer = u32;
