/*!
 * Heap Scenario Tests
 * Worked allocation sequences against a small arena
 */

use pretty_assertions::assert_eq;
use runtime_heap::{FreeRegion, Heap, HeapConfig};

fn heap(capacity: usize) -> Heap {
    Heap::new(HeapConfig::with_capacity(capacity)).unwrap()
}

#[test]
fn test_first_fit_reuses_gap() {
    let mut heap = heap(1024);

    let a = heap.allocate(100).unwrap();
    let b = heap.allocate(200).unwrap();
    let c = heap.allocate(300).unwrap();

    assert_eq!(heap.offset_of(a), Some(0));
    assert_eq!(heap.offset_of(b), Some(104));
    assert_eq!(heap.offset_of(c), Some(304));
    assert_eq!(heap.allocated_bytes(), 104 + 200 + 304);
    assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 608, size: 416 }]);

    unsafe { heap.free(b, 200) };
    assert_eq!(
        heap.free_regions(),
        vec![
            FreeRegion { offset: 104, size: 200 },
            FreeRegion { offset: 608, size: 416 },
        ]
    );

    // 150 rounds to 152, which fits the gap left by the 200 byte block
    let d = heap.allocate(150).unwrap();
    assert_eq!(heap.offset_of(d), Some(104));
    assert_eq!(
        heap.free_regions(),
        vec![
            FreeRegion { offset: 256, size: 48 },
            FreeRegion { offset: 608, size: 416 },
        ]
    );

    unsafe {
        heap.free(a, 100);
        heap.free(c, 300);
        heap.free(d, 150);
    }

    assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 0, size: 1024 }]);
    assert_eq!(heap.allocated_bytes(), 0);
    assert!(heap.verify().is_ok());
}

#[test]
fn test_gap_too_small_extends_from_tail() {
    let mut heap = heap(1024);

    let a = heap.allocate(100).unwrap();
    let b = heap.allocate(64).unwrap();
    let _c = heap.allocate(300).unwrap();
    unsafe { heap.free(b, 64) };

    let d = heap.allocate(150).unwrap();
    assert_eq!(heap.offset_of(d), Some(104 + 64 + 304));
    assert_eq!(heap.offset_of(a), Some(0));
}

#[test]
fn test_pool_lifo_reuse() {
    let mut heap = heap(1024);

    let _x = heap.allocate(16).unwrap();
    let y = heap.allocate(16).unwrap();
    let _z = heap.allocate(16).unwrap();
    let regions = heap.free_regions();

    unsafe { heap.free(y, 16) };
    assert_eq!(heap.pooled_chunks(), vec![0, 1, 0, 0]);

    let w = heap.allocate(16).unwrap();
    assert_eq!(w, y);
    assert_eq!(heap.free_regions(), regions);
    assert_eq!(heap.pooled_chunks(), vec![0, 0, 0, 0]);
}

#[test]
fn test_whole_arena_in_one_block() {
    let mut heap = heap(512);

    let all = heap.allocate(512).unwrap();
    assert!(heap.free_regions().is_empty());
    assert!(heap.allocate_or_null(8).is_none());

    unsafe { heap.free(all, 512) };
    assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 0, size: 512 }]);
}

#[test]
fn test_request_larger_than_arena_fails() {
    let mut heap = heap(512);
    assert!(heap.allocate_or_null(4096).is_none());
    assert!(heap.try_allocate(513).is_err());
    assert_eq!(heap.allocated_bytes(), 0);
}
