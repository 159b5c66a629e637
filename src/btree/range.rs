//! Lazy range scans
//!
//! Leaves carry no sibling pointers, so the scan re-descends from the
//! root for every leaf. On the way down it remembers the smallest
//! separator greater than the current position; that separator is where
//! the next leaf starts. Each leaf is read under its own read transaction.

use std::collections::VecDeque;

use crate::error::{Result, XlbError};
use crate::node::{Key, LeafNode, Node};
use crate::serializer::Value;
use crate::storage::{FileHandler, PageRead, ReadTransaction};

use super::overflow::load_value;
use super::MAX_HEIGHT;

/// Iterator over `(key, value)` pairs with `low <= key <= high`
pub struct RangeIter<'a> {
    handler: &'a FileHandler,

    /// Smallest key not yet examined
    next: Option<Key>,
    high: Key,

    buffer: VecDeque<(Value, Value)>,
}

impl<'a> RangeIter<'a> {
    pub(super) fn new(handler: &'a FileHandler, low: Key, high: Key) -> Self {
        let next = if low <= high { Some(low) } else { None };
        Self {
            handler,
            next,
            high,
            buffer: VecDeque::new(),
        }
    }

    /// Load the next leaf holding in-range entries
    fn fill(&mut self) -> Result<()> {
        while self.buffer.is_empty() {
            let Some(start) = self.next.take() else {
                return Ok(());
            };

            let mut txn = self.handler.read_transaction();
            let (leaf, upper) = descend(&mut txn, &start)?;

            let mut past_high = false;
            for entry in leaf.entries.iter().filter(|e| e.key >= start) {
                if entry.key > self.high {
                    past_high = true;
                    break;
                }
                let key = entry.key.to_value()?;
                let value = load_value(&mut txn, &entry.value)?;
                self.buffer.push_back((key, value));
            }

            self.next = match upper {
                Some(upper) if !past_high && upper <= self.high => Some(upper),
                _ => None,
            };
        }
        Ok(())
    }
}

impl Iterator for RangeIter<'_> {
    type Item = Result<(Value, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            if let Err(e) = self.fill() {
                self.next = None;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Leaf owning `key`, plus the separator bounding that leaf from above
fn descend(txn: &mut ReadTransaction<'_>, key: &Key) -> Result<(LeafNode, Option<Key>)> {
    let mut page = txn.root();
    let mut upper: Option<Key> = None;
    for _ in 0..MAX_HEIGHT {
        match txn.get_node(page)? {
            Node::Leaf(leaf) => return Ok((leaf, upper)),
            Node::Internal(mut node) => {
                let idx = node.child_index(key);
                if idx < node.keys.len() {
                    upper = Some(node.keys.swap_remove(idx));
                }
                page = node.children[idx];
            }
            _ => return Err(XlbError::corrupt(page, "expected a tree node")),
        }
    }
    Err(XlbError::corrupt(page, "tree is deeper than possible"))
}
