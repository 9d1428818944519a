/*!
 * Memory Types
 * Common types for heap management
 */

use crate::core::types::Size;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum MemoryError {
    #[error("Out of memory: requested {requested} bytes ({allocated} bytes allocated, gave up at pressure {pressure})")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("The reclaimer could not free enough space. Raise the arena capacity or release live blocks.")
    )]
    OutOfMemory {
        requested: Size,
        allocated: Size,
        pressure: MemoryPressure,
    },

    #[error("Zero-sized allocation requested")]
    #[diagnostic(code(memory::zero_size))]
    ZeroSize,

    #[error("Invalid heap configuration: {0}")]
    #[diagnostic(code(memory::invalid_config))]
    InvalidConfig(String),

    #[error("Could not reserve a {capacity} byte arena from the host")]
    #[diagnostic(code(memory::arena_unavailable))]
    ArenaUnavailable { capacity: Size },

    #[error("Heap corruption detected at offset 0x{offset:x}: {reason}")]
    #[diagnostic(
        code(memory::corruption),
        help("A block was probably freed twice or with the wrong size.")
    )]
    CorruptionDetected { offset: usize, reason: String },

    #[error("Heap finalized with {bytes} bytes still allocated")]
    #[diagnostic(code(memory::leaked))]
    Leaked { bytes: Size },
}

/// How aggressively the reclaimer should try to free memory
///
/// Ordered: `None < Low < High < Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPressure {
    None,
    Low,
    High,
    Full,
}

impl MemoryPressure {
    /// The next, more aggressive level, or `None` once at `Full`
    pub fn escalate(self) -> Option<MemoryPressure> {
        match self {
            MemoryPressure::None => Some(MemoryPressure::Low),
            MemoryPressure::Low => Some(MemoryPressure::High),
            MemoryPressure::High => Some(MemoryPressure::Full),
            MemoryPressure::Full => None,
        }
    }
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::None => write!(f, "NONE"),
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Full => write!(f, "FULL"),
        }
    }
}

/// Client categories tracked by the statistics collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    ByteCode,
    String,
    Object,
    Property,
}

/// Snapshot of one free-list region
///
/// `offset` is relative to the arena start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRegion {
    pub offset: usize,
    pub size: Size,
}

impl FreeRegion {
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}
