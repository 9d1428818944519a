/*!
 * Heap Simulator - Main Entry Point
 *
 * Drives a scripted mixed workload against one heap:
 * - Small and large allocations with a rotating size pattern
 * - Periodic in-place resizes
 * - A reclaimer that releases the oldest live blocks under pressure
 * - Occasional defragmentation into the pool caches
 *
 * Usage: heap-sim [iterations]
 */

use runtime_heap::{init_tracing, Heap, HeapConfig, MemoryPressure, ReclaimContext, Size};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::error::Error;
use std::ptr::NonNull;
use std::rc::Rc;
use tracing::{info, warn};

const DEFAULT_ITERATIONS: usize = 10_000;

/// Request sizes cycled through by the workload
const SIZES: [Size; 12] = [8, 16, 24, 100, 32, 256, 12, 1024, 40, 4096, 20, 600];

type LiveBlocks = Rc<RefCell<VecDeque<(NonNull<u8>, Size)>>>;

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let iterations = match std::env::args().nth(1) {
        Some(raw) => raw.parse()?,
        None => DEFAULT_ITERATIONS,
    };

    let config = HeapConfig::from_env()?;
    info!(?config, iterations, "Heap simulator starting");

    let live: LiveBlocks = Rc::new(RefCell::new(VecDeque::new()));
    let mut heap = Heap::with_reclaimer(config, oldest_first(live.clone()))?;

    let mut failures = 0usize;
    for i in 0..iterations {
        let size = SIZES[i % SIZES.len()];

        let Some(block) = heap.allocate_or_null(size) else {
            failures += 1;
            continue;
        };
        live.borrow_mut().push_back((block, size));

        if i % 7 == 0 {
            resize_newest(&mut heap, &live)?;
        }
        if i % 1000 == 999 {
            heap.defragment();
        }
        if i % 3 == 0 {
            if let Some((ptr, size)) = live.borrow_mut().pop_front() {
                // SAFETY: every tracked block is live and recorded with its size.
                unsafe { heap.free(ptr, size) };
            }
        }
    }

    info!(
        live_blocks = live.borrow().len(),
        failures,
        allocated = heap.allocated_bytes(),
        free_regions = heap.free_regions().len(),
        "Workload finished"
    );

    heap.verify()?;

    #[cfg(feature = "mem-stats")]
    {
        let stats = heap.stats();
        println!("{stats}");
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    for (ptr, size) in live.borrow_mut().drain(..) {
        // SAFETY: as above; the list is emptied so nothing is freed twice.
        unsafe { heap.free(ptr, size) };
    }
    heap.finalize()?;

    if failures > 0 {
        warn!(failures, "Some allocations could not be satisfied");
    }
    Ok(())
}

/// Reclaimer that frees a pressure-dependent share of the oldest blocks
fn oldest_first(live: LiveBlocks) -> impl FnMut(MemoryPressure, &mut ReclaimContext<'_>) {
    move |pressure, heap| {
        let mut live = live.borrow_mut();
        let keep = match pressure {
            MemoryPressure::None => live.len(),
            MemoryPressure::Low => live.len() / 2,
            MemoryPressure::High => live.len() / 4,
            MemoryPressure::Full => 0,
        };

        while live.len() > keep {
            let Some((ptr, size)) = live.pop_front() else {
                break;
            };
            // SAFETY: the block is live and no longer tracked anywhere else.
            unsafe { heap.free(ptr, size) };
        }
    }
}

/// Double the most recent block, keeping its contents
fn resize_newest(heap: &mut Heap, live: &LiveBlocks) -> Result<(), Box<dyn Error>> {
    let Some((ptr, size)) = live.borrow_mut().pop_back() else {
        return Ok(());
    };

    // SAFETY: the block was just taken out of the tracked set, so the
    // reclaimer cannot free it while the resize runs.
    match unsafe { heap.try_resize(ptr, size, size * 2) } {
        Ok(resized) => live.borrow_mut().push_back((resized, size * 2)),
        Err(e) => {
            warn!(error = %e, size, "Resize failed, keeping the original block");
            live.borrow_mut().push_back((ptr, size));
        }
    }
    Ok(())
}
