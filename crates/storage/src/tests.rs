use super::*;
use buffer::BufferPool;
use tempfile::tempdir;

fn pool(dir: &std::path::Path) -> BufferPool {
    BufferPool::new(dir, 100)
}

#[test]
fn heap_round_trip() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path());
    HeapFile::create(&mut pool, "t", 4).unwrap();
    let mut heap = HeapFile::open(&mut pool, "t").unwrap();

    let id = heap.add(b"abcd").unwrap();
    assert_eq!(heap.read(id).unwrap().unwrap(), b"abcd");
}

#[test]
fn slot_reuse_is_lifo() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path());
    HeapFile::create(&mut pool, "t", 4).unwrap();
    let mut heap = HeapFile::open(&mut pool, "t").unwrap();

    let a = heap.add(b"aaaa").unwrap();
    let b = heap.add(b"bbbb").unwrap();
    heap.delete(a).unwrap();
    heap.delete(b).unwrap();

    // Most recently freed (b) must be reused first.
    let reused1 = heap.add(b"cccc").unwrap();
    assert_eq!(reused1, b);
    let reused2 = heap.add(b"dddd").unwrap();
    assert_eq!(reused2, a);
}

#[test]
fn next_record_skips_tombstones_in_ascending_order() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path());
    HeapFile::create(&mut pool, "t", 4).unwrap();
    let mut heap = HeapFile::open(&mut pool, "t").unwrap();

    let ids: Vec<_> = (0..5).map(|i| heap.add(format!("{i:0>4}").as_bytes())).collect();
    let ids: Vec<i32> = ids.into_iter().map(|r| r.unwrap()).collect();
    heap.delete(ids[1]).unwrap();
    heap.delete(ids[3]).unwrap();

    let mut seen = Vec::new();
    while let Some((id, _)) = heap.next_record().unwrap() {
        seen.push(id);
    }
    assert_eq!(seen, vec![ids[0], ids[2], ids[4]]);
    assert_eq!(heap.record_count() - 2, seen.len() as i32);
}

#[test]
fn delete_rejects_out_of_range_or_double_delete() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path());
    HeapFile::create(&mut pool, "t", 4).unwrap();
    let mut heap = HeapFile::open(&mut pool, "t").unwrap();

    assert!(!heap.delete(0).unwrap());
    let id = heap.add(b"abcd").unwrap();
    assert!(heap.delete(id).unwrap());
    assert!(!heap.delete(id).unwrap());
}

#[test]
fn records_span_multiple_pages() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path());
    HeapFile::create(&mut pool, "t", 8).unwrap();
    let mut heap = HeapFile::open(&mut pool, "t").unwrap();

    let slots_per_page = PAGE_SIZE as i32 / 9;
    let total = slots_per_page * 3;
    let mut ids = Vec::new();
    for i in 0..total {
        let payload = format!("{i:0>8}");
        ids.push(heap.add(payload.as_bytes()).unwrap());
    }
    for (i, id) in ids.iter().enumerate() {
        let payload = heap.read(*id).unwrap().unwrap();
        assert_eq!(payload, format!("{i:0>8}").as_bytes());
    }
}

#[test]
fn reopen_sees_committed_state() {
    let dir = tempdir().unwrap();
    let mut pool = pool(dir.path());
    HeapFile::create(&mut pool, "t", 4).unwrap();
    {
        let mut heap = HeapFile::open(&mut pool, "t").unwrap();
        heap.add(b"abcd").unwrap();
    }
    pool.flush().unwrap();
    let mut heap = HeapFile::open(&mut pool, "t").unwrap();
    assert_eq!(heap.record_count(), 1);
    assert_eq!(heap.read(0).unwrap().unwrap(), b"abcd");
}
