//! Free-page list
//!
//! Reclaimed page addresses, handed out smallest first. Pages released
//! inside a transaction stay pending until it commits, since a rollback
//! still needs their old contents.

use std::collections::BTreeSet;

use super::PageId;

#[derive(Debug, Clone, Default)]
pub struct FreeList {
    available: BTreeSet<PageId>,
    pending: Vec<PageId>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page found Free at open
    pub fn insert(&mut self, page: PageId) {
        self.available.insert(page);
    }

    /// Take the smallest reusable page
    pub fn pop(&mut self) -> Option<PageId> {
        self.available.pop_first()
    }

    /// Mark a page vacated by the running transaction
    pub fn release(&mut self, page: PageId) {
        self.pending.push(page);
    }

    /// Make pages released by the committed transaction reusable
    pub fn commit(&mut self) {
        self.available.extend(self.pending.drain(..));
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn contains(&self, page: PageId) -> bool {
        self.available.contains(&page)
    }
}
