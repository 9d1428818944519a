/*!
 * Resize Tests
 * Every growth path keeps the block's contents
 */

use pretty_assertions::assert_eq;
use runtime_heap::{Heap, HeapConfig};
use std::ptr::NonNull;

fn heap(capacity: usize) -> Heap {
    Heap::new(HeapConfig::with_capacity(capacity)).unwrap()
}

fn fill(block: NonNull<u8>, len: usize, seed: u8) {
    let bytes = unsafe { std::slice::from_raw_parts_mut(block.as_ptr(), len) };
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = seed ^ (i as u8);
    }
}

fn assert_holds(block: NonNull<u8>, len: usize, seed: u8) {
    let bytes = unsafe { std::slice::from_raw_parts(block.as_ptr(), len) };
    for (i, byte) in bytes.iter().enumerate() {
        assert_eq!(*byte, seed ^ (i as u8), "byte {i} changed");
    }
}

#[test]
fn test_grow_and_shrink_round_trip() {
    let mut heap = heap(4096);
    let block = heap.allocate(50).unwrap();
    fill(block, 50, 0x5a);

    let grown = unsafe { heap.resize(block, 50, 1000) }.unwrap();
    assert_holds(grown, 50, 0x5a);

    let shrunk = unsafe { heap.resize(grown, 1000, 10) }.unwrap();
    assert_holds(shrunk, 10, 0x5a);

    unsafe { heap.free(shrunk, 10) };
    heap.finalize().unwrap();
}

#[cfg(not(feature = "system-allocator"))]
mod arena {
    use super::*;
    use pretty_assertions::assert_eq;
    use runtime_heap::FreeRegion;

    #[test]
    fn test_grow_into_following_region_keeps_address() {
        let mut heap = heap(512);
        let block = heap.allocate(64).unwrap();
        fill(block, 64, 1);

        let grown = unsafe { heap.resize(block, 64, 128) }.unwrap();
        assert_eq!(grown, block);
        assert_holds(grown, 64, 1);
        assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 128, size: 384 }]);
        assert_eq!(heap.allocated_bytes(), 128);
    }

    #[test]
    fn test_grow_into_preceding_region_moves_down() {
        let mut heap = heap(256);
        let a = heap.allocate(64).unwrap();
        let b = heap.allocate(64).unwrap();
        let _c = heap.allocate(128).unwrap();
        unsafe { heap.free(a, 64) };
        fill(b, 64, 2);

        let grown = unsafe { heap.resize(b, 64, 96) }.unwrap();
        assert_eq!(heap.offset_of(grown), Some(32));
        assert_holds(grown, 64, 2);
        assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 0, size: 32 }]);
        assert!(heap.verify().is_ok());
    }

    #[test]
    fn test_small_following_region_falls_back_to_preceding() {
        let mut heap = heap(320);
        let a = heap.allocate(128).unwrap();
        let b = heap.allocate(64).unwrap();
        let c = heap.allocate(40).unwrap();
        let _d = heap.allocate(88).unwrap();
        unsafe {
            heap.free(a, 128);
            heap.free(c, 40);
        }
        fill(b, 64, 3);

        let grown = unsafe { heap.resize(b, 64, 128) }.unwrap();
        assert_eq!(heap.offset_of(grown), Some(64));
        assert_holds(grown, 64, 3);
        assert_eq!(
            heap.free_regions(),
            vec![
                FreeRegion { offset: 0, size: 64 },
                FreeRegion { offset: 192, size: 40 },
            ]
        );
    }

    #[test]
    fn test_grow_without_neighbours_copies() {
        let mut heap = heap(512);
        let a = heap.allocate(64).unwrap();
        let _b = heap.allocate(64).unwrap();
        fill(a, 64, 4);

        let grown = unsafe { heap.resize(a, 64, 200) }.unwrap();
        assert_eq!(heap.offset_of(grown), Some(128));
        assert_holds(grown, 64, 4);
        assert_eq!(
            heap.free_regions(),
            vec![
                FreeRegion { offset: 0, size: 64 },
                FreeRegion { offset: 328, size: 184 },
            ]
        );
    }

    #[test]
    fn test_shrink_merges_tail_with_free_neighbour() {
        let mut heap = heap(256);
        let block = heap.allocate(128).unwrap();

        let shrunk = unsafe { heap.resize(block, 128, 40) }.unwrap();
        assert_eq!(shrunk, block);
        assert_eq!(heap.free_regions(), vec![FreeRegion { offset: 40, size: 216 }]);
        assert_eq!(heap.allocated_bytes(), 40);
    }

    #[test]
    fn test_try_resize_reports_exhaustion() {
        let mut heap = heap(128);
        let block = heap.allocate(128).unwrap();
        fill(block, 128, 5);

        assert!(unsafe { heap.try_resize(block, 128, 256) }.is_err());
        assert_holds(block, 128, 5);
        assert_eq!(heap.allocated_bytes(), 128);
    }
}
