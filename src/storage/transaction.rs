//! Transaction guards
//!
//! Both guards hold the global lock for their whole lifetime. A write
//! transaction that is dropped without [`WriteTransaction::commit`] rolls
//! back, so every exit path (including `?` and panics) releases the lock
//! with the WAL and cache in a consistent state.

use std::ops::{Deref, DerefMut};

use parking_lot::MutexGuard;

use crate::config::TreeConf;
use crate::error::Result;
use crate::node::{Meta, Node};

use super::{Pages, PageId};

/// Page reads available inside any transaction
pub trait PageRead {
    fn get_node(&mut self, page: PageId) -> Result<Node>;

    fn meta(&self) -> &Meta;

    fn conf(&self) -> &TreeConf {
        &self.meta().conf
    }

    fn root(&self) -> PageId {
        self.meta().root
    }
}

// =============================================================================
// Write Transaction
// =============================================================================

/// Exclusive access with commit-or-rollback semantics
pub struct WriteTransaction<'a> {
    pages: MutexGuard<'a, Pages>,
    finished: bool,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn begin(mut pages: MutexGuard<'a, Pages>) -> Self {
        pages.take_snapshot();
        Self {
            pages,
            finished: false,
        }
    }

    /// Durably commit everything staged, then release the lock.
    ///
    /// If the commit frame cannot be written the transaction rolls back.
    /// A checkpoint triggered by the WAL size threshold runs after the
    /// commit is already durable; its failure is reported but does not
    /// undo the commit.
    pub fn commit(mut self) -> Result<()> {
        self.pages.commit_staged()?;
        self.finished = true;
        if self.pages.wants_checkpoint() {
            self.pages.checkpoint()?;
        }
        Ok(())
    }

    /// Discard everything staged, then release the lock
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.pages.rollback_staged()
    }
}

impl Deref for WriteTransaction<'_> {
    type Target = Pages;

    fn deref(&self) -> &Pages {
        &self.pages
    }
}

impl DerefMut for WriteTransaction<'_> {
    fn deref_mut(&mut self) -> &mut Pages {
        &mut self.pages
    }
}

impl PageRead for WriteTransaction<'_> {
    fn get_node(&mut self, page: PageId) -> Result<Node> {
        self.pages.get_node(page)
    }

    fn meta(&self) -> &Meta {
        self.pages.meta()
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::debug!("Write transaction did not commit, rolling back");
        if let Err(e) = self.pages.rollback_staged() {
            tracing::error!("Rollback failed: {}", e);
        }
    }
}

// =============================================================================
// Read Transaction
// =============================================================================

/// Shared-lock read access; releases on drop
pub struct ReadTransaction<'a> {
    pages: MutexGuard<'a, Pages>,
}

impl<'a> ReadTransaction<'a> {
    pub(crate) fn begin(pages: MutexGuard<'a, Pages>) -> Self {
        Self { pages }
    }
}

impl PageRead for ReadTransaction<'_> {
    fn get_node(&mut self, page: PageId) -> Result<Node> {
        self.pages.get_node(page)
    }

    fn meta(&self) -> &Meta {
        self.pages.meta()
    }
}
