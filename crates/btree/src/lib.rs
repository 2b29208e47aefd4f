//! Disk-resident B+-tree index, keyed on fixed-length byte strings and
//! storing [`RecordId`] values.
//!
//! File layout: page 0 holds the header `order | key_len | node_count | root
//! | first_empty`; every other page is a [`node::BPTreeNode`]. Grounded on
//! `examples/original_source/src/index/bpTree.cpp`.

mod node;

pub use node::BPTreeNode;

use buffer::{BufferPool, PAGE_SIZE};
use common::{DbError, DbResult, PageId, RecordId};

const HEADER_ORDER: usize = 0;
const HEADER_KEY_LEN: usize = 4;
const HEADER_NODE_COUNT: usize = 8;
const HEADER_ROOT: usize = 12;
const HEADER_FIRST_EMPTY: usize = 16;

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

enum Outcome {
    Failed,
    Normal,
    Add(Vec<u8>, PageId),
    Remove,
    Change(Vec<u8>),
}

/// A disk-resident B+-tree, opened against one logical file in a
/// [`BufferPool`].
pub struct BPTree {
    filename: String,
    order: i32,
    key_len: usize,
    node_count: i32,
    root: PageId,
    first_empty: PageId,
}

impl BPTree {
    /// Create a new, empty tree file. `order` defaults to the per-page
    /// key-pointer capacity when `None`.
    pub fn create(
        pool: &mut BufferPool,
        filename: &str,
        key_len: usize,
        order: Option<i32>,
    ) -> DbResult<()> {
        let order = order.unwrap_or_else(|| (PAGE_SIZE as i32 - 8) / (key_len as i32 + 4) + 1);
        let data_dir = pool.data_dir().to_path_buf();
        buffer::ensure_file_exists(&data_dir, filename)?;
        let page = pool.get(filename, 0)?;
        write_i32(&mut page.bytes, HEADER_ORDER, order);
        write_i32(&mut page.bytes, HEADER_KEY_LEN, key_len as i32);
        write_i32(&mut page.bytes, HEADER_NODE_COUNT, 0);
        write_i32(&mut page.bytes, HEADER_ROOT, -1);
        write_i32(&mut page.bytes, HEADER_FIRST_EMPTY, -1);
        page.dirty = true;
        Ok(())
    }

    /// Open an existing tree, reading its header.
    pub fn open(pool: &mut BufferPool, filename: &str) -> DbResult<Self> {
        let page = pool.get(filename, 0)?;
        let order = read_i32(&page.bytes, HEADER_ORDER);
        if order <= 0 {
            return Err(DbError::Storage(format!(
                "index file '{filename}' has an invalid or missing header"
            )));
        }
        let key_len = read_i32(&page.bytes, HEADER_KEY_LEN) as usize;
        let node_count = read_i32(&page.bytes, HEADER_NODE_COUNT);
        let root = read_i32(&page.bytes, HEADER_ROOT);
        let first_empty = read_i32(&page.bytes, HEADER_FIRST_EMPTY);
        Ok(Self {
            filename: filename.to_string(),
            order,
            key_len,
            node_count,
            root,
            first_empty,
        })
    }

    pub fn key_len(&self) -> usize {
        self.key_len
    }

    fn persist_header(&self, pool: &mut BufferPool) -> DbResult<()> {
        let page = pool.get(&self.filename, 0)?;
        write_i32(&mut page.bytes, HEADER_NODE_COUNT, self.node_count);
        write_i32(&mut page.bytes, HEADER_ROOT, self.root);
        write_i32(&mut page.bytes, HEADER_FIRST_EMPTY, self.first_empty);
        page.dirty = true;
        Ok(())
    }

    fn alloc_page(&mut self, pool: &mut BufferPool) -> DbResult<PageId> {
        if self.first_empty >= 0 {
            let id = self.first_empty;
            let page = pool.get(&self.filename, id)?;
            self.first_empty = read_i32(&page.bytes, 0);
            Ok(id)
        } else {
            let id = self.node_count;
            self.node_count += 1;
            Ok(id)
        }
    }

    fn free_page(&mut self, pool: &mut BufferPool, id: PageId) -> DbResult<()> {
        let old_first_empty = self.first_empty;
        let page = pool.get(&self.filename, id)?;
        write_i32(&mut page.bytes, 0, old_first_empty);
        page.dirty = true;
        self.first_empty = id;
        Ok(())
    }

    fn load(&self, pool: &mut BufferPool, id: PageId) -> DbResult<BPTreeNode> {
        BPTreeNode::load(pool, &self.filename, id, self.key_len)
    }

    /// Look up `key`. `None` if the tree is empty or the key is absent.
    pub fn find(&self, pool: &mut BufferPool, key: &[u8]) -> DbResult<Option<RecordId>> {
        if self.root < 0 {
            return Ok(None);
        }
        self.find_rec(pool, self.root, key)
    }

    fn find_rec(&self, pool: &mut BufferPool, id: PageId, key: &[u8]) -> DbResult<Option<RecordId>> {
        let node = self.load(pool, id)?;
        let pos = node.find_position(key);
        if node.is_leaf() {
            if pos > 0 && node.key(pos) == key {
                Ok(Some(node.pointer(pos)))
            } else {
                Ok(None)
            }
        } else {
            self.find_rec(pool, node.pointer(pos), key)
        }
    }

    /// Insert `(key, value)`. Returns `false` on a duplicate key.
    pub fn add(&mut self, pool: &mut BufferPool, key: &[u8], value: RecordId) -> DbResult<bool> {
        let outcome = if self.root < 0 {
            Outcome::Add(key.to_vec(), value)
        } else {
            self.add_rec(pool, self.root, key, value)?
        };

        let ok = match outcome {
            Outcome::Failed => false,
            Outcome::Add(out_key, new_child) => {
                let new_root_id = self.alloc_page(pool)?;
                let old_root = self.root;
                let mut node = BPTreeNode::new_empty(
                    new_root_id,
                    self.key_len,
                    old_root < 0,
                    if old_root < 0 { -1 } else { old_root },
                );
                node.insert(0, &out_key, new_child);
                node.save(pool, &self.filename)?;
                self.root = new_root_id;
                true
            }
            _ => true,
        };
        self.persist_header(pool)?;
        Ok(ok)
    }

    fn add_rec(
        &mut self,
        pool: &mut BufferPool,
        id: PageId,
        key: &[u8],
        value: RecordId,
    ) -> DbResult<Outcome> {
        let mut node = self.load(pool, id)?;
        let pos = node.find_position(key);

        if node.is_leaf() {
            if pos > 0 && node.key(pos) == key {
                return Ok(Outcome::Failed);
            }
            node.insert(pos, key, value);
            let outcome = self.maybe_split(pool, &mut node)?;
            node.save(pool, &self.filename)?;
            return Ok(outcome);
        }

        let child = node.pointer(pos);
        let result = self.add_rec(pool, child, key, value)?;
        let outcome = match result {
            Outcome::Failed => Outcome::Failed,
            Outcome::Add(out_key, new_child) => {
                let insert_pos = node.find_position(&out_key);
                node.insert(insert_pos, &out_key, new_child);
                self.maybe_split(pool, &mut node)?
            }
            _ => unreachable!("add recursion only yields Failed or Add"),
        };
        node.save(pool, &self.filename)?;
        Ok(outcome)
    }

    fn maybe_split(&mut self, pool: &mut BufferPool, node: &mut BPTreeNode) -> DbResult<Outcome> {
        if node.size() < self.order {
            return Ok(Outcome::Normal);
        }
        let new_id = self.alloc_page(pool)?;
        let (mut right, sep) = node.split(new_id);
        right.save(pool, &self.filename)?;
        Ok(Outcome::Add(sep, new_id))
    }

    /// Remove `key`. Returns `false` if it was absent.
    pub fn remove(&mut self, pool: &mut BufferPool, key: &[u8]) -> DbResult<bool> {
        if self.root < 0 {
            return Ok(false);
        }
        let outcome = self.remove_rec(pool, self.root, 0, true, None, key)?;
        let ok = !matches!(outcome, Outcome::Failed);
        self.persist_header(pool)?;
        Ok(ok)
    }

    #[allow(clippy::too_many_arguments)]
    fn remove_rec(
        &mut self,
        pool: &mut BufferPool,
        id: PageId,
        sib_id: PageId,
        left_sib: bool,
        parent_key: Option<&[u8]>,
        key: &[u8],
    ) -> DbResult<Outcome> {
        let mut node = self.load(pool, id)?;
        let pos = node.find_position(key);

        let child_outcome = if node.is_leaf() {
            Outcome::Failed
        } else {
            let next_id = node.pointer(pos);
            let next_sib = node.pointer(if pos > 0 { pos - 1 } else { pos + 1 });
            let next_parent_key = node.key(if pos > 0 { pos } else { pos + 1 }).to_vec();
            self.remove_rec(pool, next_id, next_sib, pos > 0, Some(&next_parent_key), key)?
        };

        let effective = if node.is_leaf() {
            if pos > 0 && node.key(pos) == key {
                Outcome::Remove
            } else {
                Outcome::Failed
            }
        } else {
            child_outcome
        };

        let outcome = match effective {
            Outcome::Failed => Outcome::Failed,
            Outcome::Change(new_key) => {
                let at = if pos > 0 { pos } else { pos + 1 };
                node.set_key(at, &new_key);
                Outcome::Normal
            }
            Outcome::Remove => {
                let at = if pos > 0 { pos } else { pos + 1 };
                node.remove(at);

                if id == self.root {
                    if node.size() == 0 {
                        self.root = node.pointer(0);
                        self.free_page(pool, id)?;
                        node.discard();
                    }
                    Outcome::Normal
                } else {
                    let lim = (self.order + 2) / 2 - 1;
                    if node.size() < lim {
                        let mut sib = self.load(pool, sib_id)?;
                        if sib.size() > lim {
                            let parent_key =
                                parent_key.expect("non-root underflow always has a parent key");
                            let new_key = node.borrow(&mut sib, left_sib, parent_key);
                            sib.save(pool, &self.filename)?;
                            Outcome::Change(new_key)
                        } else if left_sib {
                            let parent_key =
                                parent_key.expect("non-root underflow always has a parent key");
                            sib.merge_right(&node, parent_key);
                            self.free_page(pool, id)?;
                            node.discard();
                            sib.save(pool, &self.filename)?;
                            Outcome::Remove
                        } else {
                            let parent_key =
                                parent_key.expect("non-root underflow always has a parent key");
                            node.merge_right(&sib, parent_key);
                            self.free_page(pool, sib_id)?;
                            sib.discard();
                            Outcome::Remove
                        }
                    } else {
                        Outcome::Normal
                    }
                }
            }
            Outcome::Normal | Outcome::Add(..) => Outcome::Normal,
        };

        node.save(pool, &self.filename)?;
        Ok(outcome)
    }
}
