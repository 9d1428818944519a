/*!
 * Memory Traits
 * Reclamation abstraction consumed by the heap
 */

use super::heap::ReclaimContext;
use super::types::MemoryPressure;

/// The collector's entry point, injected into the heap at construction
///
/// The heap calls `reclaim` synchronously from inside an allocation that could
/// not be satisfied, with pressure escalating `Low -> High -> Full`. The
/// implementation releases unreachable blocks through the supplied
/// [`ReclaimContext`], which exposes `free` and shrinking only; allocating
/// from inside the callback is not possible.
pub trait Reclaimer {
    /// Free zero or more previously issued blocks, more aggressively as
    /// `pressure` rises. Must not panic under normal operation.
    fn reclaim(&mut self, pressure: MemoryPressure, heap: &mut ReclaimContext<'_>);
}

impl<F> Reclaimer for F
where
    F: FnMut(MemoryPressure, &mut ReclaimContext<'_>),
{
    fn reclaim(&mut self, pressure: MemoryPressure, heap: &mut ReclaimContext<'_>) {
        self(pressure, heap)
    }
}

/// Reclaimer for heaps without a collector
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReclaim;

impl Reclaimer for NoReclaim {
    fn reclaim(&mut self, _pressure: MemoryPressure, _heap: &mut ReclaimContext<'_>) {}
}
