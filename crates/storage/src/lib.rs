//! Fixed-record heap file with an in-band free-slot list.
//!
//! Every record occupies `record_length + 1` bytes on disk: payload followed
//! by a single tombstone byte. Deleted slots are threaded into a singly
//! linked free list through the first four payload bytes, exactly like the
//! original `HeapFile::addRecord`/`deleteRecord` pair this module is
//! grounded on (`examples/original_source/src/file/heapFile.cpp`).

#[cfg(test)]
mod tests;

use buffer::{BufferPool, PAGE_SIZE};
use common::{DbError, DbResult, PageId, RecordId};

const HEADER_SLOT_LEN: usize = 0;
const HEADER_RECORD_COUNT: usize = 4;
const HEADER_FIRST_EMPTY: usize = 8;

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// A fixed-length-record file over a single logical file name in the
/// buffer pool.
pub struct HeapFile<'a> {
    pool: &'a mut BufferPool,
    filename: String,
    slot_len: i32,
    slots_per_page: i32,
    record_count: i32,
    first_empty: i32,
    cursor: i32,
}

impl<'a> HeapFile<'a> {
    /// Create a new heap file. `record_length` excludes the tombstone byte.
    pub fn create(pool: &mut BufferPool, filename: &str, record_length: i32) -> DbResult<()> {
        let data_dir = pool.data_dir().to_path_buf();
        buffer::ensure_file_exists(&data_dir, filename)?;
        let slot_len = record_length + 1;
        let page = pool.get(filename, 0)?;
        write_i32(&mut page.bytes, HEADER_SLOT_LEN, slot_len);
        write_i32(&mut page.bytes, HEADER_RECORD_COUNT, 0);
        write_i32(&mut page.bytes, HEADER_FIRST_EMPTY, -1);
        page.dirty = true;
        Ok(())
    }

    /// Open an existing heap file, reading its header.
    pub fn open(pool: &'a mut BufferPool, filename: &str) -> DbResult<Self> {
        let page = pool.get(filename, 0)?;
        let slot_len = read_i32(&page.bytes, HEADER_SLOT_LEN);
        if slot_len <= 0 {
            return Err(DbError::Storage(format!(
                "heap file '{filename}' has an invalid or missing header"
            )));
        }
        let record_count = read_i32(&page.bytes, HEADER_RECORD_COUNT);
        let first_empty = read_i32(&page.bytes, HEADER_FIRST_EMPTY);
        let slots_per_page = (PAGE_SIZE as i32) / slot_len;
        Ok(Self {
            pool,
            filename: filename.to_string(),
            slot_len,
            slots_per_page,
            record_count,
            first_empty,
            cursor: -1,
        })
    }

    pub fn record_length(&self) -> i32 {
        self.slot_len - 1
    }

    pub fn record_count(&self) -> i32 {
        self.record_count
    }

    fn page_and_offset(&self, id: RecordId) -> (PageId, usize) {
        let page = 1 + id / self.slots_per_page;
        let offset = ((id % self.slots_per_page) * self.slot_len) as usize;
        (page, offset)
    }

    fn persist_header(&mut self) -> DbResult<()> {
        let page = self.pool.get(&self.filename, 0)?;
        write_i32(&mut page.bytes, HEADER_RECORD_COUNT, self.record_count);
        write_i32(&mut page.bytes, HEADER_FIRST_EMPTY, self.first_empty);
        page.dirty = true;
        Ok(())
    }

    /// Advance the per-instance cursor and return the next live record,
    /// skipping tombstoned slots. `None` once the cursor reaches
    /// `record_count`.
    pub fn next_record(&mut self) -> DbResult<Option<(RecordId, Vec<u8>)>> {
        loop {
            if self.cursor + 1 >= self.record_count {
                return Ok(None);
            }
            self.cursor += 1;
            let id = self.cursor;
            let (page_id, offset) = self.page_and_offset(id);
            let record_len = self.record_length() as usize;
            let page = self.pool.get(&self.filename, page_id)?;
            let tombstone = page.bytes[offset + record_len];
            if tombstone == 0 {
                let payload = page.bytes[offset..offset + record_len].to_vec();
                return Ok(Some((id, payload)));
            }
        }
    }

    /// Random-access read; `None` if out of range or tombstoned.
    pub fn read(&mut self, id: RecordId) -> DbResult<Option<Vec<u8>>> {
        if id < 0 || id >= self.record_count {
            return Ok(None);
        }
        let (page_id, offset) = self.page_and_offset(id);
        let record_len = self.record_length() as usize;
        let page = self.pool.get(&self.filename, page_id)?;
        if page.bytes[offset + record_len] != 0 {
            return Ok(None);
        }
        Ok(Some(page.bytes[offset..offset + record_len].to_vec()))
    }

    /// Append (or reuse a freed slot for) `payload`, returning its id.
    pub fn add(&mut self, payload: &[u8]) -> DbResult<RecordId> {
        let record_len = self.record_length() as usize;
        if payload.len() != record_len {
            return Err(DbError::Storage(format!(
                "payload length {} does not match record length {record_len}",
                payload.len()
            )));
        }

        let id = if self.first_empty >= 0 {
            self.first_empty
        } else {
            self.record_count
        };
        let (page_id, offset) = self.page_and_offset(id);
        let page = self.pool.get(&self.filename, page_id)?;

        if self.first_empty >= 0 {
            self.first_empty = read_i32(&page.bytes, offset);
        } else {
            self.record_count += 1;
        }

        page.bytes[offset..offset + record_len].copy_from_slice(payload);
        page.bytes[offset + record_len] = 0;
        page.dirty = true;

        self.persist_header()?;
        Ok(id)
    }

    /// Tombstone a live slot and thread it onto the free list.
    pub fn delete(&mut self, id: RecordId) -> DbResult<bool> {
        if id < 0 || id >= self.record_count {
            return Ok(false);
        }
        let record_len = self.record_length() as usize;
        let (page_id, offset) = self.page_and_offset(id);
        let page = self.pool.get(&self.filename, page_id)?;
        if page.bytes[offset + record_len] != 0 {
            return Ok(false);
        }

        let first_empty = self.first_empty;
        write_i32(&mut page.bytes, offset, first_empty);
        page.bytes[offset + record_len] = 1;
        page.dirty = true;

        self.first_empty = id;
        self.persist_header()?;
        Ok(true)
    }
}
