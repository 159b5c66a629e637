//! Insert with splits
//!
//! ```text
//!   leaf reaches m entries          internal reaches m+1 children
//!   [1 2 3 4]                       [a b c d]
//!       │                               │
//!       ▼                               ▼
//!   [1 2] [3 4]  promote 3          [a b] [d]  move c up
//! ```

use crate::error::{Result, XlbError};
use crate::node::{Entry, InternalNode, Key, LeafNode, Node};
use crate::serializer::{encode_value, Value};
use crate::storage::{PageId, PageRead, WriteTransaction};

use super::overflow::{load_value, release_value, store_value};
use super::tree::find_leaf;

/// Insert or overwrite `key`, returning the replaced value
pub(super) fn insert(
    txn: &mut WriteTransaction<'_>,
    key: Key,
    value: &Value,
) -> Result<Option<Value>> {
    let (value_type, bytes) = encode_value(value)?;
    let (mut leaf, mut path) = find_leaf(txn, &key)?;

    match leaf.search(&key) {
        Ok(i) => {
            let old = leaf.entries[i].value.clone();
            let previous = load_value(txn, &old)?;
            release_value(txn, &old)?;
            leaf.entries[i].value = store_value(txn, value_type, bytes)?;
            txn.set_node(Node::Leaf(leaf))?;
            Ok(Some(previous))
        }
        Err(i) => {
            let stored = store_value(txn, value_type, bytes)?;
            leaf.entries.insert(i, Entry { key, value: stored });

            if leaf.entries.len() <= txn.conf().max_leaf_entries() {
                txn.set_node(Node::Leaf(leaf))?;
                return Ok(None);
            }

            let (separator, right) = split_leaf(txn, leaf)?;
            promote(txn, &mut path, separator, right)?;
            Ok(None)
        }
    }
}

/// Move the upper half of an overfull leaf to a new page
fn split_leaf(txn: &mut WriteTransaction<'_>, mut leaf: LeafNode) -> Result<(Key, PageId)> {
    let mid = leaf.entries.len() / 2;
    let right = LeafNode {
        page: txn.next_available_page()?,
        entries: leaf.entries.split_off(mid),
    };
    let separator = right.entries[0].key.clone();

    tracing::debug!("Split leaf {} into {}", leaf.page, right.page);

    let right_page = right.page;
    txn.set_node(Node::Leaf(leaf))?;
    txn.set_node(Node::Leaf(right))?;
    Ok((separator, right_page))
}

/// Move the upper half of an overfull internal node to a new page; the
/// median key goes up
fn split_internal(
    txn: &mut WriteTransaction<'_>,
    mut node: InternalNode,
) -> Result<(Key, PageId)> {
    let mid = node.keys.len() / 2;
    let right_keys = node.keys.split_off(mid + 1);
    let right_children = node.children.split_off(mid + 1);
    // keys[mid] is the last key left behind
    let median = node
        .keys
        .pop()
        .ok_or_else(|| XlbError::corrupt(node.page, "internal node without keys"))?;

    let right = InternalNode {
        page: txn.next_available_page()?,
        keys: right_keys,
        children: right_children,
    };

    tracing::debug!("Split internal node {} into {}", node.page, right.page);

    let right_page = right.page;
    txn.set_node(Node::Internal(node))?;
    txn.set_node(Node::Internal(right))?;
    Ok((median, right_page))
}

/// Carry a split up the descent path, growing a new root if it reaches the top
fn promote(
    txn: &mut WriteTransaction<'_>,
    path: &mut Vec<(InternalNode, usize)>,
    mut separator: Key,
    mut right: PageId,
) -> Result<()> {
    while let Some((mut parent, idx)) = path.pop() {
        parent.keys.insert(idx, separator);
        parent.children.insert(idx + 1, right);

        if parent.children.len() <= txn.conf().max_children() {
            return txn.set_node(Node::Internal(parent));
        }
        (separator, right) = split_internal(txn, parent)?;
    }

    let left = txn.root();
    let root = InternalNode {
        page: txn.next_available_page()?,
        keys: vec![separator],
        children: vec![left, right],
    };
    tracing::debug!("Tree grew a level, new root {}", root.page);
    txn.ensure_root_block(Node::Internal(root))
}
