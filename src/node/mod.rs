//! Node Module
//!
//! Decoded forms of the pages that make up the tree, and their codec.
//!
//! ## Page Kinds
//! ```text
//! ┌────────┬──────────────────────────────────────────────┐
//! │ Tag 0  │ Leaf (flag bit 0 set) or Internal node       │
//! │ Tag 1  │ Overflow: continuation of a large value      │
//! │ Tag 2  │ Free: reclaimable, never handed to the tree  │
//! └────────┴──────────────────────────────────────────────┘
//! ```
//! Page 0 is the meta page and has no tag; see [`Meta`].

mod codec;
mod meta;

pub use codec::{is_free_page, NodeCodec, TAG_FREE, TAG_NODE, TAG_OVERFLOW};
pub use meta::{Meta, META_SIZE};

use std::cmp::Ordering;

use crate::error::Result;
use crate::serializer::{decode_value, encode_value, Value};
use crate::storage::PageId;

/// A serialized key. Ordering is on the raw bytes (type tag first).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub tag: u8,
    pub bytes: Vec<u8>,
}

impl Key {
    pub fn from_value(value: &Value) -> Result<Self> {
        let (value_type, bytes) = encode_value(value)?;
        Ok(Self {
            tag: value_type as u8,
            bytes,
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        decode_value(self.tag, &self.bytes)
    }
}

/// Where a value's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueData {
    /// Stored in the leaf itself
    Inline(Vec<u8>),

    /// Stored in an overflow chain starting at `first`
    Overflow { first: PageId, len: u32 },
}

/// A serialized value as it sits in a leaf entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub tag: u8,
    pub data: ValueData,
}

impl StoredValue {
    /// First overflow page, if the value spilled out of the leaf
    pub fn overflow_page(&self) -> Option<PageId> {
        match self.data {
            ValueData::Overflow { first, .. } => Some(first),
            ValueData::Inline(_) => None,
        }
    }
}

/// One key-value pair of a leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: StoredValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub page: PageId,
    pub entries: Vec<Entry>,
}

impl LeafNode {
    pub fn new(page: PageId) -> Self {
        Self {
            page,
            entries: Vec::new(),
        }
    }

    /// `Ok(i)` if the key is at `i`, `Err(i)` for its insertion point
    pub fn search(&self, key: &Key) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|e| e.key.cmp(key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    pub page: PageId,
    pub keys: Vec<Key>,
    pub children: Vec<PageId>,
}

impl InternalNode {
    /// Index `i` of the child with `keys[i-1] <= key < keys[i]`
    pub fn child_index(&self, key: &Key) -> usize {
        self.keys.partition_point(|k| k.cmp(key) != Ordering::Greater)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowNode {
    pub page: PageId,
    pub next: Option<PageId>,
    pub data: Vec<u8>,
}

/// Decoded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
    Overflow(OverflowNode),
    Free(PageId),
}

impl Node {
    pub fn page(&self) -> PageId {
        match self {
            Node::Leaf(n) => n.page,
            Node::Internal(n) => n.page,
            Node::Overflow(n) => n.page,
            Node::Free(page) => *page,
        }
    }
}
