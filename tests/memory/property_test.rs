/*!
 * Property Tests
 * Randomized alloc/free/resize interleavings against the arena invariants
 */

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime_heap::{FreeRegion, Heap, HeapConfig};
use std::ptr::NonNull;

const CAPACITY: usize = 8192;

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
    Resize(usize, usize),
    Defragment,
    ReclaimPools,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..600).prop_map(Op::Alloc),
        3 => any::<usize>().prop_map(Op::Free),
        2 => (any::<usize>(), 1usize..900).prop_map(|(i, size)| Op::Resize(i, size)),
        1 => Just(Op::Defragment),
        1 => Just(Op::ReclaimPools),
    ]
}

fn align(size: usize) -> usize {
    (size + 7) & !7
}

struct Live {
    ptr: NonNull<u8>,
    size: usize,
    seed: u8,
}

fn stamp(block: &Live) {
    unsafe { std::ptr::write_bytes(block.ptr.as_ptr(), block.seed, block.size) };
}

fn intact(block: &Live, len: usize) -> bool {
    let bytes = unsafe { std::slice::from_raw_parts(block.ptr.as_ptr(), len) };
    bytes.iter().all(|&b| b == block.seed)
}

fn free_all(heap: &mut Heap, live: Vec<Live>) {
    for block in live {
        unsafe { heap.free(block.ptr, block.size) };
    }
    heap.reclaim_pools();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_coalescing_holds_after_every_op(ops in prop::collection::vec(op(), 1..120)) {
        let mut heap = Heap::new(HeapConfig::with_capacity(CAPACITY)).unwrap();
        let mut live: Vec<Live> = Vec::new();

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Alloc(size) => {
                    if let Some(ptr) = heap.allocate_or_null(size) {
                        let block = Live { ptr, size, seed: step as u8 };
                        stamp(&block);
                        live.push(block);
                    }
                }
                Op::Free(i) if !live.is_empty() => {
                    let block = live.swap_remove(i % live.len());
                    prop_assert!(intact(&block, block.size));
                    unsafe { heap.free(block.ptr, block.size) };
                }
                Op::Resize(i, new_size) if !live.is_empty() => {
                    let index = i % live.len();
                    let block = &mut live[index];
                    if let Ok(ptr) = unsafe { heap.try_resize(block.ptr, block.size, new_size) } {
                        let kept = block.size.min(new_size);
                        block.ptr = ptr;
                        block.size = new_size;
                        prop_assert!(intact(block, kept));
                        stamp(block);
                    }
                }
                Op::Defragment => {
                    heap.defragment();
                }
                Op::ReclaimPools => {
                    heap.reclaim_pools();
                }
                _ => {}
            }

            prop_assert!(heap.verify().is_ok(), "{:?}", heap.verify());
            let regions = heap.free_regions();
            for pair in regions.windows(2) {
                prop_assert!(pair[0].end() < pair[1].offset);
            }
        }

        for block in &live {
            prop_assert!(intact(block, block.size));
        }
        free_all(&mut heap, live);
        prop_assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 0, size: CAPACITY }]);
        prop_assert_eq!(heap.allocated_bytes(), 0);
    }

    #[test]
    fn prop_capacity_round_trip(
        sizes in prop::collection::vec(1usize..400, 1..60),
        order in prop::collection::vec(any::<prop::sample::Index>(), 60),
    ) {
        let mut heap = Heap::new(HeapConfig::with_capacity(CAPACITY)).unwrap();
        let mut live = Vec::new();
        let mut total = 0;

        for size in sizes {
            if total + align(size) > CAPACITY {
                break;
            }
            total += align(size);

            let ptr = heap.allocate_or_null(size);
            prop_assert!(ptr.is_some(), "{} bytes failed with {} in use", size, total);
            live.push((ptr.unwrap(), size));
        }
        prop_assert_eq!(heap.allocated_bytes(), total);

        for index in order {
            if live.is_empty() {
                break;
            }
            let (ptr, size) = live.swap_remove(index.index(live.len()));
            unsafe { heap.free(ptr, size) };
        }
        for (ptr, size) in live.drain(..) {
            unsafe { heap.free(ptr, size) };
        }
        heap.reclaim_pools();

        prop_assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 0, size: CAPACITY }]);
    }

    #[test]
    fn prop_pool_serves_only_its_class(freed in 1usize..=32, requested in 1usize..=32) {
        let mut heap = Heap::new(HeapConfig::with_capacity(1024)).unwrap();
        let _before = heap.allocate(64).unwrap();
        let chunk = heap.allocate(freed).unwrap();
        let _after = heap.allocate(64).unwrap();
        unsafe { heap.free(chunk, freed) };

        let got = heap.allocate(requested).unwrap();
        if align(freed) == align(requested) {
            prop_assert_eq!(got, chunk);
        } else {
            prop_assert_ne!(got, chunk);
        }
    }

    #[test]
    fn prop_resize_preserves_prefix(old in 1usize..500, new in 1usize..500, neighbour in 0u8..3) {
        let mut heap = Heap::new(HeapConfig::with_capacity(4096)).unwrap();
        let before = heap.allocate(64).unwrap();
        let block = Live { ptr: heap.allocate(old).unwrap(), size: old, seed: 0xa5 };
        let after = heap.allocate(64).unwrap();
        stamp(&block);

        // Optionally free the block before or after it
        match neighbour {
            1 => unsafe { heap.free(before, 64) },
            2 => unsafe { heap.free(after, 64) },
            _ => {}
        }

        let ptr = unsafe { heap.resize(block.ptr, old, new) }.unwrap();
        let resized = Live { ptr, size: new, seed: 0xa5 };
        prop_assert!(intact(&resized, old.min(new)));
        prop_assert!(heap.verify().is_ok());
    }
}

#[test]
fn test_seeded_stress() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut heap = Heap::new(HeapConfig::with_capacity(64 * 1024)).unwrap();
    let mut live: Vec<Live> = Vec::new();

    for step in 0..20_000u32 {
        let roll = rng.gen_range(0..10);
        if roll < 5 || live.is_empty() {
            let size = if rng.gen_bool(0.6) {
                rng.gen_range(1..=32)
            } else {
                rng.gen_range(33..=2048)
            };
            if let Some(ptr) = heap.allocate_or_null(size) {
                let block = Live { ptr, size, seed: step as u8 };
                stamp(&block);
                live.push(block);
            }
        } else if roll < 8 {
            let block = live.swap_remove(rng.gen_range(0..live.len()));
            assert!(intact(&block, block.size), "block corrupted at step {step}");
            unsafe { heap.free(block.ptr, block.size) };
        } else {
            let index = rng.gen_range(0..live.len());
            let new_size = rng.gen_range(1..=3000);
            let block = &mut live[index];
            if let Ok(ptr) = unsafe { heap.try_resize(block.ptr, block.size, new_size) } {
                assert!(intact(&Live { ptr, size: 0, seed: block.seed }, block.size.min(new_size)));
                block.ptr = ptr;
                block.size = new_size;
                stamp(block);
            }
        }

        if step % 1000 == 0 {
            heap.verify().unwrap();
        }
    }

    free_all(&mut heap, live);
    assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 0, size: 64 * 1024 }]);
    heap.finalize().unwrap();
}
