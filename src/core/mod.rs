/*!
 * Core Module
 * Fundamental heap types and constants
 */

pub mod limits;
pub mod types;

// Re-export for convenience
pub use limits::align_up;
pub use types::*;
