//! Delete with rebalancing
//!
//! An underfull node first tries to borrow one item from an adjacent
//! sibling under the same parent, rotating through the parent's
//! separator. If neither sibling can spare one, the node and a sibling
//! merge and the vacated page is freed. The parent lost a child in the
//! merge, so the check repeats one level up. A root internal node left
//! with a single child is replaced by that child.

use crate::config::TreeConf;
use crate::error::{Result, XlbError};
use crate::node::{InternalNode, Key, LeafNode, Node};
use crate::serializer::Value;
use crate::storage::{PageId, PageRead, WriteTransaction};

use super::overflow::{load_value, release_value};
use super::tree::find_leaf;

/// Remove `key`, returning its value
pub(super) fn delete(txn: &mut WriteTransaction<'_>, key: &Key) -> Result<Option<Value>> {
    let (mut leaf, mut path) = find_leaf(txn, key)?;

    let Ok(i) = leaf.search(key) else {
        return Ok(None);
    };

    let entry = leaf.entries.remove(i);
    let removed = load_value(txn, &entry.value)?;
    release_value(txn, &entry.value)?;

    let conf = *txn.conf();
    let mut node = Node::Leaf(leaf);

    loop {
        let Some((mut parent, idx)) = path.pop() else {
            return finish_root(txn, node).map(|()| Some(removed));
        };
        if !underflows(&conf, &node) {
            txn.set_node(node)?;
            return Ok(Some(removed));
        }
        match node {
            Node::Leaf(leaf) => rebalance_leaf(txn, &conf, &mut parent, idx, leaf)?,
            Node::Internal(internal) => {
                rebalance_internal(txn, &conf, &mut parent, idx, internal)?
            }
            other => return Err(XlbError::corrupt(other.page(), "expected a tree node")),
        }
        node = Node::Internal(parent);
    }
}

fn underflows(conf: &TreeConf, node: &Node) -> bool {
    match node {
        Node::Leaf(leaf) => leaf.entries.len() < conf.min_leaf_entries(),
        Node::Internal(internal) => internal.children.len() < conf.min_children(),
        _ => false,
    }
}

/// Write the root, collapsing an internal root with one child
fn finish_root(txn: &mut WriteTransaction<'_>, root: Node) -> Result<()> {
    match root {
        Node::Internal(internal) if internal.children.len() == 1 => {
            let child = txn.get_node(internal.children[0])?;
            tracing::debug!(
                "Tree lost a level, root {} replaced by {}",
                internal.page,
                child.page()
            );
            txn.ensure_root_block(child)?;
            txn.free_page(internal.page)
        }
        root => txn.set_node(root),
    }
}

// =============================================================================
// Leaves
// =============================================================================

fn rebalance_leaf(
    txn: &mut WriteTransaction<'_>,
    conf: &TreeConf,
    parent: &mut InternalNode,
    idx: usize,
    mut leaf: LeafNode,
) -> Result<()> {
    let mut left = match idx.checked_sub(1) {
        Some(i) => Some(load_leaf(txn, parent.children[i])?),
        None => None,
    };
    if let Some(left) = left.as_mut().filter(|l| l.entries.len() > conf.min_leaf_entries()) {
        if let Some(moved) = left.entries.pop() {
            leaf.entries.insert(0, moved);
        }
        parent.keys[idx - 1] = leaf.entries[0].key.clone();
        tracing::trace!("Leaf {} borrowed from left sibling {}", leaf.page, left.page);
        txn.set_node(Node::Leaf(left.clone()))?;
        return txn.set_node(Node::Leaf(leaf));
    }

    let mut right = match parent.children.get(idx + 1) {
        Some(&page) => Some(load_leaf(txn, page)?),
        None => None,
    };
    if let Some(right) = right.as_mut().filter(|r| r.entries.len() > conf.min_leaf_entries()) {
        leaf.entries.push(right.entries.remove(0));
        parent.keys[idx] = right.entries[0].key.clone();
        tracing::trace!("Leaf {} borrowed from right sibling {}", leaf.page, right.page);
        txn.set_node(Node::Leaf(right.clone()))?;
        return txn.set_node(Node::Leaf(leaf));
    }

    if let Some(mut left) = left {
        tracing::debug!("Merged leaf {} into left sibling {}", leaf.page, left.page);
        left.entries.append(&mut leaf.entries);
        parent.keys.remove(idx - 1);
        parent.children.remove(idx);
        txn.set_node(Node::Leaf(left))?;
        return txn.free_page(leaf.page);
    }

    if let Some(mut right) = right {
        tracing::debug!("Merged right sibling {} into leaf {}", right.page, leaf.page);
        leaf.entries.append(&mut right.entries);
        parent.keys.remove(idx);
        parent.children.remove(idx + 1);
        txn.set_node(Node::Leaf(leaf))?;
        return txn.free_page(right.page);
    }

    Err(XlbError::corrupt(parent.page, "internal node with a single child"))
}

fn load_leaf(txn: &mut WriteTransaction<'_>, page: PageId) -> Result<LeafNode> {
    match txn.get_node(page)? {
        Node::Leaf(leaf) => Ok(leaf),
        _ => Err(XlbError::corrupt(page, "sibling of a leaf is not a leaf")),
    }
}

// =============================================================================
// Internal Nodes
// =============================================================================

fn rebalance_internal(
    txn: &mut WriteTransaction<'_>,
    conf: &TreeConf,
    parent: &mut InternalNode,
    idx: usize,
    mut node: InternalNode,
) -> Result<()> {
    let mut left = match idx.checked_sub(1) {
        Some(i) => Some(load_internal(txn, parent.children[i])?),
        None => None,
    };
    if let Some(left) = left.as_mut().filter(|l| l.children.len() > conf.min_children()) {
        let (Some(key), Some(child)) = (left.keys.pop(), left.children.pop()) else {
            return Err(XlbError::corrupt(left.page, "internal node without keys"));
        };
        let separator = std::mem::replace(&mut parent.keys[idx - 1], key);
        node.keys.insert(0, separator);
        node.children.insert(0, child);
        tracing::trace!("Node {} borrowed from left sibling {}", node.page, left.page);
        txn.set_node(Node::Internal(left.clone()))?;
        return txn.set_node(Node::Internal(node));
    }

    let mut right = match parent.children.get(idx + 1) {
        Some(&page) => Some(load_internal(txn, page)?),
        None => None,
    };
    if let Some(right) = right.as_mut().filter(|r| r.children.len() > conf.min_children()) {
        let key = right.keys.remove(0);
        let child = right.children.remove(0);
        let separator = std::mem::replace(&mut parent.keys[idx], key);
        node.keys.push(separator);
        node.children.push(child);
        tracing::trace!("Node {} borrowed from right sibling {}", node.page, right.page);
        txn.set_node(Node::Internal(right.clone()))?;
        return txn.set_node(Node::Internal(node));
    }

    if let Some(mut left) = left {
        tracing::debug!("Merged node {} into left sibling {}", node.page, left.page);
        left.keys.push(parent.keys.remove(idx - 1));
        left.keys.append(&mut node.keys);
        left.children.append(&mut node.children);
        parent.children.remove(idx);
        txn.set_node(Node::Internal(left))?;
        return txn.free_page(node.page);
    }

    if let Some(mut right) = right {
        tracing::debug!("Merged right sibling {} into node {}", right.page, node.page);
        node.keys.push(parent.keys.remove(idx));
        node.keys.append(&mut right.keys);
        node.children.append(&mut right.children);
        parent.children.remove(idx + 1);
        txn.set_node(Node::Internal(node))?;
        return txn.free_page(right.page);
    }

    Err(XlbError::corrupt(parent.page, "internal node with a single child"))
}

fn load_internal(txn: &mut WriteTransaction<'_>, page: PageId) -> Result<InternalNode> {
    match txn.get_node(page)? {
        Node::Internal(node) => Ok(node),
        _ => Err(XlbError::corrupt(page, "sibling of an internal node is not internal")),
    }
}
