//! Node codec
//!
//! Encoding and decoding of tree pages.
//!
//! ## Page Layouts
//!
//! ### Leaf / Internal (tag 0)
//! ```text
//! ┌─────────┬───────────┬───────────┬──────────────────────────────┐
//! │ Tag (1) │ Flags (1) │ Count (2) │ Body                         │
//! └─────────┴───────────┴───────────┴──────────────────────────────┘
//! ```
//! - Leaf body: `Count` × entry
//!   - key: tag (1) + len (2) + bytes
//!   - value: tag (1) + kind (1) + ...
//!     - kind 0 (inline): len (4) + bytes
//!     - kind 1 (overflow): total len (4) + first page (4)
//! - Internal body: `Count` × key, then `Count + 1` × child page (4)
//!
//! ### Overflow (tag 1)
//! ```text
//! ┌─────────┬──────────┬───────────────┬─────────────┐
//! │ Tag (1) │ Next (4) │ ChunkLen (4)  │ Chunk       │
//! └─────────┴──────────┴───────────────┴─────────────┘
//! ```
//! `Next = 0` ends the chain (page 0 is the meta page, never an overflow).
//!
//! ### Free (tag 2)
//! Tag only, rest zero.

use bytes::{Buf, BufMut};

use crate::config::TreeConf;
use crate::error::{Result, XlbError};
use crate::storage::PageId;

use super::{Entry, InternalNode, Key, LeafNode, Node, OverflowNode, StoredValue, ValueData};

pub const TAG_NODE: u8 = 0;
pub const TAG_OVERFLOW: u8 = 1;
pub const TAG_FREE: u8 = 2;

const FLAG_LEAF: u8 = 0x01;

const KIND_INLINE: u8 = 0;
const KIND_OVERFLOW: u8 = 1;

/// Whether a raw page carries the Free tag
pub fn is_free_page(raw: &[u8]) -> bool {
    raw.first() == Some(&TAG_FREE)
}

/// Encodes and decodes pages for one tree configuration
#[derive(Debug, Clone, Copy)]
pub struct NodeCodec {
    conf: TreeConf,
}

impl NodeCodec {
    pub fn new(conf: TreeConf) -> Self {
        Self { conf }
    }

    pub fn conf(&self) -> &TreeConf {
        &self.conf
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode a node into exactly `page_size` bytes
    pub fn encode(&self, node: &Node) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.conf.page_size);

        match node {
            Node::Leaf(leaf) => {
                buf.put_u8(TAG_NODE);
                buf.put_u8(FLAG_LEAF);
                buf.put_u16(self.count(leaf.page, leaf.entries.len())?);
                for entry in &leaf.entries {
                    self.put_key(&mut buf, leaf.page, &entry.key)?;
                    self.put_value(&mut buf, leaf.page, &entry.value)?;
                }
            }
            Node::Internal(internal) => {
                if internal.children.len() != internal.keys.len() + 1 {
                    return Err(XlbError::corrupt(
                        internal.page,
                        format!(
                            "internal node has {} keys but {} children",
                            internal.keys.len(),
                            internal.children.len()
                        ),
                    ));
                }
                buf.put_u8(TAG_NODE);
                buf.put_u8(0);
                buf.put_u16(self.count(internal.page, internal.keys.len())?);
                for key in &internal.keys {
                    self.put_key(&mut buf, internal.page, key)?;
                }
                for child in &internal.children {
                    buf.put_u32(*child);
                }
            }
            Node::Overflow(overflow) => {
                buf.put_u8(TAG_OVERFLOW);
                buf.put_u32(overflow.next.unwrap_or(0));
                buf.put_u32(overflow.data.len() as u32);
                buf.put_slice(&overflow.data);
            }
            Node::Free(_) => {
                buf.put_u8(TAG_FREE);
            }
        }

        if buf.len() > self.conf.page_size {
            return Err(XlbError::corrupt(
                node.page(),
                format!(
                    "encoded node is {} bytes, page size is {}",
                    buf.len(),
                    self.conf.page_size
                ),
            ));
        }
        buf.resize(self.conf.page_size, 0);
        Ok(buf)
    }

    fn count(&self, page: PageId, n: usize) -> Result<u16> {
        u16::try_from(n).map_err(|_| XlbError::corrupt(page, format!("{} items in one node", n)))
    }

    fn put_key(&self, buf: &mut Vec<u8>, page: PageId, key: &Key) -> Result<()> {
        if key.bytes.len() > self.conf.key_size {
            return Err(XlbError::corrupt(
                page,
                format!(
                    "key of {} bytes exceeds key_size {}",
                    key.bytes.len(),
                    self.conf.key_size
                ),
            ));
        }
        buf.put_u8(key.tag);
        buf.put_u16(key.bytes.len() as u16);
        buf.put_slice(&key.bytes);
        Ok(())
    }

    fn put_value(&self, buf: &mut Vec<u8>, page: PageId, value: &StoredValue) -> Result<()> {
        buf.put_u8(value.tag);
        match &value.data {
            ValueData::Inline(bytes) => {
                if bytes.len() > self.conf.value_size {
                    return Err(XlbError::corrupt(
                        page,
                        format!(
                            "inline value of {} bytes exceeds value_size {}",
                            bytes.len(),
                            self.conf.value_size
                        ),
                    ));
                }
                buf.put_u8(KIND_INLINE);
                buf.put_u32(bytes.len() as u32);
                buf.put_slice(bytes);
            }
            ValueData::Overflow { first, len } => {
                buf.put_u8(KIND_OVERFLOW);
                buf.put_u32(*len);
                buf.put_u32(*first);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decode a tree page. Free pages and unknown tags are corruption:
    /// the tree must never be routed to either.
    pub fn decode(&self, page: PageId, raw: &[u8]) -> Result<Node> {
        let mut reader = PageReader { page, buf: raw };
        match reader.u8()? {
            TAG_NODE => {
                let flags = reader.u8()?;
                let count = reader.u16()? as usize;
                if flags & FLAG_LEAF != 0 {
                    let mut entries = Vec::with_capacity(count);
                    for _ in 0..count {
                        let key = reader.key()?;
                        let value = reader.value()?;
                        entries.push(Entry { key, value });
                    }
                    Ok(Node::Leaf(LeafNode { page, entries }))
                } else {
                    let mut keys = Vec::with_capacity(count);
                    for _ in 0..count {
                        keys.push(reader.key()?);
                    }
                    let mut children = Vec::with_capacity(count + 1);
                    for _ in 0..=count {
                        children.push(reader.u32()?);
                    }
                    Ok(Node::Internal(InternalNode {
                        page,
                        keys,
                        children,
                    }))
                }
            }
            TAG_OVERFLOW => {
                let next = reader.u32()?;
                let len = reader.u32()? as usize;
                let data = reader.bytes(len)?;
                Ok(Node::Overflow(OverflowNode {
                    page,
                    next: if next == 0 { None } else { Some(next) },
                    data,
                }))
            }
            TAG_FREE => Err(XlbError::corrupt(
                page,
                "free page can only be used by page reclamation",
            )),
            other => Err(XlbError::corrupt(page, format!("unknown node type: {}", other))),
        }
    }
}

/// Bounds-checked big-endian reader over a page
struct PageReader<'a> {
    page: PageId,
    buf: &'a [u8],
}

impl PageReader<'_> {
    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(XlbError::corrupt(
                self.page,
                format!("truncated page: needed {} more bytes", n),
            ));
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.need(len)?;
        let out = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(out)
    }

    fn key(&mut self) -> Result<Key> {
        let tag = self.u8()?;
        let len = self.u16()? as usize;
        let bytes = self.bytes(len)?;
        Ok(Key { tag, bytes })
    }

    fn value(&mut self) -> Result<StoredValue> {
        let tag = self.u8()?;
        let data = match self.u8()? {
            KIND_INLINE => {
                let len = self.u32()? as usize;
                ValueData::Inline(self.bytes(len)?)
            }
            KIND_OVERFLOW => {
                let len = self.u32()?;
                let first = self.u32()?;
                ValueData::Overflow { first, len }
            }
            other => {
                return Err(XlbError::corrupt(
                    self.page,
                    format!("unknown value kind: {}", other),
                ))
            }
        };
        Ok(StoredValue { tag, data })
    }
}
