//! Storage Module
//!
//! The transaction coordinator: owns the database file, the WAL, the page
//! cache and the free-page list, and is the only way to reach a page.
//!
//! ## Responsibilities
//! - Scoped read/write transactions over one global lock
//! - Page reads: cache → WAL → database file
//! - Page writes: WAL only; the file changes at checkpoint
//! - Page allocation from the free list before growing the file
//! - Meta page upkeep and open-time reconciliation
//!
//! ## File Layout
//! ```text
//! ┌────────┬────────┬────────┬─────┬────────┐
//! │ Meta   │ Page 1 │ Page 2 │ ... │ Page N │   {path}
//! └────────┴────────┴────────┴─────┴────────┘
//!   each exactly page_size bytes, page address = offset / page_size
//! ```

mod freelist;
mod handler;
mod transaction;

pub use freelist::FreeList;
pub use handler::{FileHandler, Pages};
pub use transaction::{PageRead, ReadTransaction, WriteTransaction};

/// A zero-based page number. Page 0 is always the meta page.
pub type PageId = u32;
