//! B-Tree Module
//!
//! Ordered key-value operations over the paged file.
//!
//! ## Responsibilities
//! - Point lookups: descend internal nodes by separator, search the leaf
//! - Insert with leaf and internal splits, growing a new root when needed
//! - Delete with borrow-from-sibling or merge, collapsing the root
//! - Lazy inclusive range scans
//! - Spilling values larger than `value_size` into overflow chains
//!
//! ## Tree Shape
//! ```text
//!                  ┌───────────┐
//!                  │  [3 | 5]  │            internal: separators only
//!                  └─┬───┬───┬─┘
//!          ┌─────────┘   │   └─────────┐
//!    ┌─────▼────┐  ┌─────▼────┐  ┌─────▼────┐
//!    │ 1:a  2:b │  │ 3:c  4:d │  │ 5:e  6:f │   leaves: all entries
//!    └──────────┘  └──────────┘  └──────────┘
//! ```
//! A key equal to a separator lives in the child to its right. Every
//! operation runs inside one transaction, so a failed insert or delete
//! leaves the tree exactly as it was.

mod delete;
mod insert;
mod overflow;
mod range;
mod tree;

pub use range::RangeIter;
pub use tree::BTree;

/// Depth at which a descent is treated as a cycle in corrupt pages
pub(crate) const MAX_HEIGHT: usize = 64;
