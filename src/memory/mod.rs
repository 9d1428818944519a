/*!
 * Memory Module
 * The runtime heap, its configuration and the reclamation seam
 */

pub mod config;
pub mod heap;
#[cfg(feature = "mem-stats")]
pub mod stats;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use config::HeapConfig;
pub use heap::{Heap, PointerCodec, ReclaimContext};
#[cfg(feature = "mem-stats")]
pub use stats::HeapStats;
pub use traits::*;
pub use types::*;
