/*!
 * Statistics Tests
 */

use pretty_assertions::assert_eq;
use runtime_heap::{Heap, HeapConfig, MemoryCategory};

#[test]
fn test_stats_track_bytes_and_waste() {
    let mut heap = Heap::new(HeapConfig::with_capacity(1024)).unwrap();

    let a = heap.allocate(100).unwrap();
    let b = heap.allocate(200).unwrap();
    let c = heap.allocate(13).unwrap();

    let stats = heap.stats();
    assert_eq!(stats.allocated_bytes, 104 + 200 + 16);
    assert_eq!(stats.waste_bytes, 4 + 3);
    assert_eq!(stats.peak_allocated_bytes, 320);

    unsafe {
        heap.free(b, 200);
        heap.free(c, 13);
    }

    let stats = heap.stats();
    assert_eq!(stats.allocated_bytes, 104);
    assert_eq!(stats.waste_bytes, 4);
    assert_eq!(stats.peak_allocated_bytes, 320);
    assert_eq!(stats.peak_waste_bytes, 7);

    unsafe { heap.free(a, 100) };
    assert_eq!(heap.stats().allocated_bytes, 0);
}

#[test]
fn test_stats_follow_resize() {
    let mut heap = Heap::new(HeapConfig::with_capacity(1024)).unwrap();
    let block = heap.allocate(60).unwrap();

    let block = unsafe { heap.resize(block, 60, 90) }.unwrap();
    assert_eq!(heap.stats().allocated_bytes, 96);
    assert_eq!(heap.stats().waste_bytes, 6);

    let block = unsafe { heap.resize(block, 90, 41) }.unwrap();
    assert_eq!(heap.stats().allocated_bytes, 48);

    unsafe { heap.free(block, 41) };
    assert_eq!(heap.stats().allocated_bytes, 0);
    assert_eq!(heap.stats().peak_allocated_bytes, 96);
}

#[test]
fn test_pool_hits_are_counted() {
    let mut heap = Heap::new(HeapConfig::with_capacity(1024)).unwrap();
    let chunk = heap.allocate(24).unwrap();
    unsafe { heap.free(chunk, 24) };
    assert_eq!(heap.stats().allocated_bytes, 0);

    let _chunk = heap.allocate(20).unwrap();
    assert_eq!(heap.stats().allocated_bytes, 24);
    assert_eq!(heap.stats().waste_bytes, 4);
}

#[test]
fn test_category_counters() {
    let mut heap = Heap::new(HeapConfig::with_capacity(1024)).unwrap();

    heap.record_category_alloc(MemoryCategory::ByteCode, 128);
    heap.record_category_alloc(MemoryCategory::Object, 64);
    heap.record_category_free(MemoryCategory::ByteCode, 128);

    let stats = heap.stats();
    assert_eq!(stats.byte_code_bytes, 0);
    assert_eq!(stats.peak_byte_code_bytes, 128);
    assert_eq!(stats.object_bytes, 64);
}

#[test]
fn test_stats_serialize_and_print() {
    let mut heap = Heap::new(HeapConfig::with_capacity(2048)).unwrap();
    let block = heap.allocate(500).unwrap();

    let stats = heap.stats();
    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["allocated_bytes"], 504);
    assert_eq!(json["peak_allocated_bytes"], 504);

    let report = stats.to_string();
    assert!(report.contains("Allocated = 504 bytes"));
    if heap.capacity() != 0 {
        assert!(stats.usage_percentage() > 24.0 && stats.usage_percentage() < 25.0);
    }

    unsafe { heap.free(block, 500) };
}
