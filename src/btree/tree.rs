//! The tree handle
//!
//! [`BTree`] is the public face of the store: it turns caller values into
//! keys, opens a transaction per operation and hands the work to the
//! insert, delete and range code.

use std::path::Path;

use crate::config::{Config, TreeConf};
use crate::error::{Result, XlbError};
use crate::node::{InternalNode, Key, LeafNode, Node};
use crate::serializer::Value;
use crate::storage::{FileHandler, PageId, PageRead};

use super::overflow::load_value;
use super::range::RangeIter;
use super::{delete, insert, MAX_HEIGHT};

/// A disk-backed B-tree
///
/// # Example
/// ```no_run
/// use xiaolongbaodb::{BTree, Config, Value};
///
/// let tree = BTree::open(Config::builder().path("/tmp/demo.db").build())?;
/// tree.insert(1, "one")?;
/// assert_eq!(tree.get(1)?, Some(Value::from("one")));
/// tree.close()?;
/// # Ok::<(), xiaolongbaodb::XlbError>(())
/// ```
pub struct BTree {
    handler: FileHandler,
}

impl BTree {
    /// Open or create the tree at `config.path`
    pub fn open(config: Config) -> Result<Self> {
        let handler = FileHandler::open(&config)?;
        Ok(Self { handler })
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Value stored under `key`, if any
    pub fn get(&self, key: impl Into<Value>) -> Result<Option<Value>> {
        let key = self.make_key(key.into())?;
        let mut txn = self.handler.read_transaction();

        let (leaf, _) = find_leaf(&mut txn, &key)?;
        match leaf.search(&key) {
            Ok(i) => Ok(Some(load_value(&mut txn, &leaf.entries[i].value)?)),
            Err(_) => Ok(None),
        }
    }

    /// Whether `key` is present
    pub fn contains(&self, key: impl Into<Value>) -> Result<bool> {
        let key = self.make_key(key.into())?;
        let mut txn = self.handler.read_transaction();

        let (leaf, _) = find_leaf(&mut txn, &key)?;
        Ok(leaf.search(&key).is_ok())
    }

    /// Store `value` under `key`, returning the value it replaced
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = self.make_key(key.into())?;
        let mut txn = self.handler.write_transaction();

        let previous = insert::insert(&mut txn, key, &value.into())?;
        txn.commit()?;
        Ok(previous)
    }

    /// Remove `key`, returning the value it held
    pub fn delete(&self, key: impl Into<Value>) -> Result<Option<Value>> {
        let key = self.make_key(key.into())?;
        let mut txn = self.handler.write_transaction();

        let removed = delete::delete(&mut txn, &key)?;
        txn.commit()?;
        Ok(removed)
    }

    // =========================================================================
    // Range Scans
    // =========================================================================

    /// Entries with `low <= key <= high`, in key order
    ///
    /// The iterator holds no lock between leaves: each leaf is read in its
    /// own read transaction, so writes may interleave with a long scan.
    pub fn range(&self, low: impl Into<Value>, high: impl Into<Value>) -> Result<RangeIter<'_>> {
        let low = self.make_key(low.into())?;
        let high = self.make_key(high.into())?;
        Ok(RangeIter::new(&self.handler, low, high))
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Fold committed WAL pages into the database file
    pub fn checkpoint(&self) -> Result<usize> {
        self.handler.checkpoint()
    }

    /// Checkpoint, delete the WAL and release the file
    pub fn close(self) -> Result<()> {
        self.handler.close()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Levels from the root to the leaves (1 for a lone root leaf)
    pub fn height(&self) -> Result<usize> {
        let mut txn = self.handler.read_transaction();
        let mut page = txn.root();
        let mut height = 1;
        loop {
            match txn.get_node(page)? {
                Node::Leaf(_) => return Ok(height),
                Node::Internal(node) => {
                    page = node.children[0];
                    height += 1;
                    if height > MAX_HEIGHT {
                        return Err(XlbError::corrupt(page, "tree is deeper than possible"));
                    }
                }
                _ => return Err(XlbError::corrupt(page, "expected a tree node")),
            }
        }
    }

    pub fn root_page(&self) -> PageId {
        self.handler.meta().root
    }

    pub fn conf(&self) -> TreeConf {
        self.handler.meta().conf
    }

    pub fn path(&self) -> &Path {
        self.handler.path()
    }

    /// The underlying file handler
    pub fn handler(&self) -> &FileHandler {
        &self.handler
    }

    /// Serialize a caller key, rejecting ones over `key_size` before any
    /// page is touched
    fn make_key(&self, value: Value) -> Result<Key> {
        let max = self.handler.meta().conf.key_size;
        let key = Key::from_value(&value)?;
        if key.bytes.len() > max {
            return Err(XlbError::KeyTooLarge {
                len: key.bytes.len(),
                max,
            });
        }
        Ok(key)
    }
}

/// Internal nodes on the way down, with the child index taken at each
pub(super) type Descent = Vec<(InternalNode, usize)>;

/// Descend from the root to the leaf that owns `key`
pub(super) fn find_leaf<R: PageRead>(txn: &mut R, key: &Key) -> Result<(LeafNode, Descent)> {
    let mut path = Vec::new();
    let mut page = txn.root();
    loop {
        match txn.get_node(page)? {
            Node::Leaf(leaf) => return Ok((leaf, path)),
            Node::Internal(node) => {
                let idx = node.child_index(key);
                page = node.children[idx];
                path.push((node, idx));
                if path.len() >= MAX_HEIGHT {
                    return Err(XlbError::corrupt(page, "tree is deeper than possible"));
                }
            }
            _ => return Err(XlbError::corrupt(page, "expected a tree node")),
        }
    }
}
