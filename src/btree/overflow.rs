//! Overflow chains
//!
//! A value whose serialized form is longer than `value_size` is written
//! whole into a chain of overflow pages; the leaf keeps only its length
//! and the first page.

use crate::error::{Result, XlbError};
use crate::node::{Node, OverflowNode, StoredValue, ValueData};
use crate::serializer::{decode_value, Value, ValueType};
use crate::storage::{PageId, PageRead, Pages};

/// Build the leaf-side form of a value, spilling it if needed
pub(super) fn store_value(
    pages: &mut Pages,
    value_type: ValueType,
    bytes: Vec<u8>,
) -> Result<StoredValue> {
    let data = if bytes.len() <= pages.conf().value_size {
        ValueData::Inline(bytes)
    } else {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            XlbError::Serialization(format!("value of {} bytes is too large", bytes.len()))
        })?;
        let first = write_chain(pages, &bytes)?;
        ValueData::Overflow { first, len }
    };
    Ok(StoredValue {
        tag: value_type as u8,
        data,
    })
}

/// Resolve a leaf entry's value, following its overflow chain
pub(super) fn load_value<R: PageRead>(txn: &mut R, value: &StoredValue) -> Result<Value> {
    match &value.data {
        ValueData::Inline(bytes) => decode_value(value.tag, bytes),
        ValueData::Overflow { first, len } => {
            let bytes = read_chain(txn, *first, *len as usize)?;
            decode_value(value.tag, &bytes)
        }
    }
}

/// Release every page of a value's overflow chain, if it has one
pub(super) fn release_value(pages: &mut Pages, value: &StoredValue) -> Result<()> {
    let mut next = value.overflow_page();
    while let Some(page) = next {
        next = match pages.get_node(page)? {
            Node::Overflow(node) => node.next,
            _ => return Err(XlbError::corrupt(page, "expected an overflow page")),
        };
        pages.free_page(page)?;
    }
    Ok(())
}

fn write_chain(pages: &mut Pages, bytes: &[u8]) -> Result<PageId> {
    let capacity = pages.conf().overflow_capacity();
    let chunks: Vec<&[u8]> = bytes.chunks(capacity).collect();

    let mut addresses = Vec::with_capacity(chunks.len());
    for _ in 0..chunks.len() {
        addresses.push(pages.next_available_page()?);
    }

    for (i, chunk) in chunks.iter().enumerate() {
        pages.set_node(Node::Overflow(OverflowNode {
            page: addresses[i],
            next: addresses.get(i + 1).copied(),
            data: chunk.to_vec(),
        }))?;
    }

    tracing::trace!(
        "Spilled {} bytes into {} overflow page(s) from {}",
        bytes.len(),
        addresses.len(),
        addresses[0]
    );
    Ok(addresses[0])
}

fn read_chain<R: PageRead>(txn: &mut R, first: PageId, len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(len);
    let mut next = Some(first);
    let mut hops = 0usize;

    while let Some(page) = next {
        let node = match txn.get_node(page)? {
            Node::Overflow(node) => node,
            _ => return Err(XlbError::corrupt(page, "expected an overflow page")),
        };
        out.extend_from_slice(&node.data);
        next = node.next;

        hops += 1;
        if out.len() > len || hops > len {
            return Err(XlbError::corrupt(page, "overflow chain is longer than its value"));
        }
    }

    if out.len() != len {
        return Err(XlbError::corrupt(
            first,
            format!("overflow chain holds {} bytes, expected {}", out.len(), len),
        ));
    }
    Ok(out)
}
