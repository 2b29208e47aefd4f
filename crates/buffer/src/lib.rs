//! Paged buffer pool: the cache every other storage subsystem reads and
//! writes through.
//!
//! [`BufferPool`] keeps at most [`BufferPool::capacity`] pages resident
//! across every open file, evicting the least-recently-used unpinned page on
//! a miss and flushing dirty pages to `data/<filename>.mdb` on eviction or
//! shutdown. No core operation currently pins a page; the flag exists so the
//! eviction policy honors it the moment one does.

#[cfg(test)]
mod tests;

use common::{DbError, DbResult, PageId};
use lru::LruCache;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const PAGE_SIZE: usize = 4096;
pub const DEFAULT_CAPACITY: usize = 100;

/// One fixed-size buffer, tagged with the file and page it mirrors.
#[derive(Debug, Clone)]
pub struct Page {
    pub filename: String,
    pub id: PageId,
    pub dirty: bool,
    pub pin: bool,
    pub bytes: Vec<u8>,
}

impl Page {
    fn zeroed(filename: &str, id: PageId) -> Self {
        Self {
            filename: filename.to_string(),
            id,
            dirty: false,
            pin: false,
            bytes: vec![0u8; PAGE_SIZE],
        }
    }
}

type Key = (String, PageId);

/// LRU-managed cache of pages, backed by one `.mdb` file per name under
/// `data_dir`.
#[derive(Debug)]
pub struct BufferPool {
    data_dir: PathBuf,
    capacity: usize,
    cache: LruCache<Key, Page>,
}

impl BufferPool {
    pub fn new(data_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be > 0");
        Self {
            data_dir: data_dir.into(),
            capacity,
            cache: LruCache::new(NonZeroUsize::new(capacity).expect("checked above")),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.data_dir.join(format!("{filename}.mdb"))
    }

    /// Fetch the page, loading it from disk on a cache miss. The returned
    /// reference is valid only until the next call to `get` on this pool
    /// (on any file), since a later call may evict it.
    pub fn get(&mut self, filename: &str, id: PageId) -> DbResult<&mut Page> {
        let key = (filename.to_string(), id);
        if !self.cache.contains(&key) {
            self.evict_victim()?;
            let page = self.load_page(filename, id)?;
            self.cache.put(key.clone(), page);
        }
        Ok(self
            .cache
            .get_mut(&key)
            .expect("page was just inserted or already cached"))
    }

    /// Drop every cached page belonging to `filename` without writing it
    /// back — used when the caller has already removed the file.
    pub fn remove_file(&mut self, filename: &str) {
        let victims: Vec<Key> = self
            .cache
            .iter()
            .filter(|((name, _), _)| name == filename)
            .map(|(k, _)| k.clone())
            .collect();
        for key in victims {
            self.cache.pop(&key);
        }
    }

    /// Write every dirty page back to disk; pages become clean afterward.
    pub fn flush(&mut self) -> DbResult<()> {
        let dirty_keys: Vec<Key> = self
            .cache
            .iter()
            .filter(|(_, page)| page.dirty)
            .map(|(k, _)| k.clone())
            .collect();
        for key in dirty_keys {
            if let Some(page) = self.cache.peek(&key) {
                self.write_back(page)?;
            }
            if let Some(page) = self.cache.get_mut(&key) {
                page.dirty = false;
            }
        }
        Ok(())
    }

    fn evict_victim(&mut self) -> DbResult<()> {
        if self.cache.len() < self.capacity {
            return Ok(());
        }
        let victim = self
            .cache
            .iter()
            .rev()
            .find(|(_, page)| !page.pin)
            .map(|(k, _)| k.clone());
        let key = victim.ok_or_else(|| {
            DbError::Storage("buffer pool full: every resident page is pinned".into())
        })?;
        if let Some(page) = self.cache.pop(&key) {
            if page.dirty {
                self.write_back(&page)?;
            }
        }
        Ok(())
    }

    fn load_page(&self, filename: &str, id: PageId) -> DbResult<Page> {
        let path = self.path_for(filename);
        if !path.exists() {
            return Err(DbError::Storage(format!(
                "fatal: page {id} requested from non-existent file '{filename}' (caller must create the file first)"
            )));
        }
        let mut file = OpenOptions::new().read(true).open(&path)?;
        let offset = id as u64 * PAGE_SIZE as u64;
        let len = file.metadata()?.len();

        let mut page = Page::zeroed(filename, id);
        if offset >= len {
            // Page has not been written yet (about to be allocated).
            return Ok(page);
        }
        file.seek(SeekFrom::Start(offset))?;
        let to_read = PAGE_SIZE.min((len - offset) as usize);
        file.read_exact(&mut page.bytes[..to_read])?;
        Ok(page)
    }

    fn write_back(&self, page: &Page) -> DbResult<()> {
        let path = self.path_for(&page.filename);
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        file.seek(SeekFrom::Start(page.id as u64 * PAGE_SIZE as u64))?;
        file.write_all(&page.bytes)?;
        Ok(())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Create an empty `.mdb` file of at least one zeroed page, as storage
/// layers expect before their first `BufferPool::get`.
pub fn ensure_file_exists(data_dir: &Path, filename: &str) -> DbResult<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(format!("{filename}.mdb"));
    if !path.exists() {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
    }
    Ok(())
}

/// Remove a file's on-disk `.mdb` artifact entirely (used by `DROP`).
pub fn delete_file(data_dir: &Path, filename: &str) -> DbResult<()> {
    let path = data_dir.join(format!("{filename}.mdb"));
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
