/*!
 * Runtime Heap Library
 * Fixed-arena allocator with pool caches, 32-bit pointer compression and
 * pressure-driven reclamation for an embedded language runtime
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::types::{CompressedPointer, Size};
pub use memory::{
    FreeRegion, Heap, HeapConfig, MemoryCategory, MemoryError, MemoryPressure, MemoryResult,
    NoReclaim, PointerCodec, ReclaimContext, Reclaimer,
};
#[cfg(feature = "mem-stats")]
pub use memory::HeapStats;
pub use monitoring::init_tracing;
