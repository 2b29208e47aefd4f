use super::*;
use tempfile::tempdir;

fn setup(capacity: usize) -> (tempfile::TempDir, BufferPool) {
    let dir = tempdir().unwrap();
    ensure_file_exists(dir.path(), "f").unwrap();
    let pool = BufferPool::new(dir.path(), capacity);
    (dir, pool)
}

#[test]
fn cache_coherence_survives_intervening_gets() {
    let (_dir, mut pool) = setup(10);
    {
        let page = pool.get("f", 0).unwrap();
        page.bytes[0] = 42;
        page.dirty = true;
    }
    // Touch a handful of other pages in between.
    for i in 1..5 {
        pool.get("f", i).unwrap();
    }
    let page = pool.get("f", 0).unwrap();
    assert_eq!(page.bytes[0], 42);
}

#[test]
fn dirty_pages_survive_eviction_round_trip() {
    let (_dir, mut pool) = setup(4);
    {
        let page = pool.get("f", 0).unwrap();
        page.bytes[0] = 7;
        page.dirty = true;
    }
    // Evict page 0 by touching enough other pages to exceed capacity.
    for i in 1..10 {
        pool.get("f", i).unwrap();
    }
    let page = pool.get("f", 0).unwrap();
    assert_eq!(page.bytes[0], 7, "dirty page must be written back before eviction");
}

#[test]
fn lru_eviction_picks_least_recently_used() {
    let (_dir, mut pool) = setup(3);
    pool.get("f", 0).unwrap();
    pool.get("f", 1).unwrap();
    pool.get("f", 2).unwrap();
    // Touch 0 again so 1 becomes the least recently used.
    pool.get("f", 0).unwrap();
    // This miss must evict page 1, not page 0 or 2.
    pool.get("f", 3).unwrap();

    assert!(pool.cache.contains(&("f".to_string(), 0)));
    assert!(pool.cache.contains(&("f".to_string(), 2)));
    assert!(pool.cache.contains(&("f".to_string(), 3)));
    assert!(!pool.cache.contains(&("f".to_string(), 1)));
}

#[test]
fn pinned_pages_are_skipped_as_victims() {
    let (_dir, mut pool) = setup(2);
    pool.get("f", 0).unwrap().pin = true;
    pool.get("f", 1).unwrap();
    pool.get("f", 2).unwrap();
    assert!(pool.cache.contains(&("f".to_string(), 0)));
}

#[test]
fn remove_file_drops_pages_without_write_back() {
    let (dir, mut pool) = setup(10);
    {
        let page = pool.get("f", 0).unwrap();
        page.bytes[0] = 9;
        page.dirty = true;
    }
    pool.remove_file("f");
    delete_file(dir.path(), "f").unwrap();
    ensure_file_exists(dir.path(), "f").unwrap();
    let page = pool.get("f", 0).unwrap();
    assert_eq!(page.bytes[0], 0, "no write-back should have happened");
}

#[test]
fn flush_clears_dirty_flags() {
    let (_dir, mut pool) = setup(10);
    pool.get("f", 0).unwrap().dirty = true;
    pool.flush().unwrap();
    assert!(!pool.cache.peek(&("f".to_string(), 0)).unwrap().dirty);
}
