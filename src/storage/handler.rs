//! File handler
//!
//! Owns every on-disk resource of a store and serializes access to them.

use std::fs::File;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::cache::PageCache;
use crate::config::{Config, TreeConf};
use crate::error::{Result, XlbError};
use crate::io;
use crate::node::{is_free_page, LeafNode, Meta, Node, NodeCodec, META_SIZE};
use crate::wal::WriteAheadLog;

use super::transaction::{ReadTransaction, WriteTransaction};
use super::{FreeList, PageId};

/// Coordinates page I/O for one database file
///
/// ## Concurrency Model
///
/// One `parking_lot::Mutex` guards all state and is shared by read and
/// write transactions, so transactions run strictly one at a time in lock
/// acquisition order. Opening a second write transaction on a thread that
/// already holds one deadlocks.
pub struct FileHandler {
    path: PathBuf,
    pages: Mutex<Pages>,
}

/// Rollback point taken when a write transaction begins
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    meta: Meta,
    free: FreeList,
    last_page: PageId,
}

/// State behind the global lock
pub struct Pages {
    file: File,

    /// `None` only after close
    wal: Option<WriteAheadLog>,

    cache: PageCache<Node>,
    codec: NodeCodec,
    meta: Meta,
    free: FreeList,

    /// Next page address past the logical end of the file
    last_page: PageId,

    checkpoint_threshold: usize,
    snapshot: Option<Snapshot>,
}

impl FileHandler {
    /// Open or create the store at `config.path`
    ///
    /// On startup:
    /// 1. Read the meta page of an existing file
    /// 2. Replay the WAL if one was left behind
    /// 3. Reconcile the requested tree shape with the stored one
    /// 4. Create the meta page and an empty root leaf for a new store
    /// 5. Rebuild the free-page list by scanning for Free pages
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.path.clone();
        if !path.exists() {
            config.tree.validate()?;
        }

        let mut file = io::open_file(&path)?;
        let file_len = io::file_len(&file)?;

        // Step 1: meta page already in the database file
        let file_meta = if file_len >= META_SIZE as u64 {
            let raw = io::read_exact_at(&mut file, 0, 0, META_SIZE)?;
            Some(Meta::decode(&raw)?)
        } else {
            None
        };

        // Step 2: page size decides how the WAL is framed
        let logged_page_size = WriteAheadLog::logged_page_size(&path)?;
        let page_size = match (&file_meta, logged_page_size) {
            (Some(meta), _) => meta.conf.page_size,
            (None, Some(logged)) => logged,
            (None, None) => config.tree.page_size,
        };
        let ragged = file_len % page_size as u64;
        if ragged != 0 && logged_page_size.is_none() {
            return Err(ragged_file(file_len, page_size));
        }

        let mut wal = WriteAheadLog::open(&path, page_size)?;

        // A checkpoint interrupted mid-page leaves a torn last page; the WAL
        // still holds its image, so drop the partial bytes
        let file_len = if ragged != 0 {
            let torn = (file_len / page_size as u64) as PageId;
            if !wal.has_committed(torn) {
                return Err(ragged_file(file_len, page_size));
            }
            tracing::warn!(
                "Database file ends in a torn page {}, restoring it from the WAL",
                torn
            );
            let boundary = file_len - ragged;
            file.set_len(boundary)?;
            io::flush_and_sync(&mut file)?;
            boundary
        } else {
            file_len
        };

        // Step 3: newest meta wins (WAL over file)
        let stored = match wal.get_page(0)? {
            Some(raw) => Some(Meta::decode(&raw)?),
            None => file_meta,
        };

        let (conf, root) = match stored {
            Some(meta) => {
                let conf = reconcile(&config.tree, &meta.conf);
                conf.validate()?;
                (conf, Some(meta.root))
            }
            None => {
                config.tree.validate()?;
                (config.tree, None)
            }
        };

        let file_pages = (file_len / page_size as u64) as PageId;
        let wal_pages = wal.max_committed_page().map_or(0, |p| p + 1);
        let last_page = file_pages.max(wal_pages).max(1);

        let pages = Pages {
            file,
            wal: Some(wal),
            cache: PageCache::new(config.effective_cache_size()),
            codec: NodeCodec::new(conf),
            meta: Meta {
                root: root.unwrap_or(1),
                conf,
            },
            free: FreeList::new(),
            last_page,
            checkpoint_threshold: config.checkpoint_threshold,
            snapshot: None,
        };

        let handler = Self {
            path,
            pages: Mutex::new(pages),
        };

        // Step 4: fresh store, or a stored meta whose order changed
        match stored {
            None => {
                let mut txn = handler.write_transaction();
                let root = txn.next_available_page()?;
                txn.ensure_root_block(Node::Leaf(LeafNode::new(root)))?;
                txn.write_meta()?;
                txn.commit()?;
                tracing::info!(
                    "Created database {:?} (order={}, page_size={}, key_size={}, value_size={})",
                    handler.path,
                    conf.order,
                    conf.page_size,
                    conf.key_size,
                    conf.value_size
                );
            }
            Some(meta) if meta.conf != conf => {
                let mut txn = handler.write_transaction();
                txn.write_meta()?;
                txn.commit()?;
                tracing::info!(
                    "Opened database {:?}, order reconciled from {} to {}",
                    handler.path,
                    meta.conf.order,
                    conf.order
                );
            }
            Some(_) => {
                tracing::info!("Opened database {:?}", handler.path);
            }
        }

        // Step 5: free-page scan
        {
            let mut pages = handler.pages.lock();
            let found = pages.scan_free_pages()?;
            if found > 0 {
                tracing::debug!("Found {} free page(s) at open", found);
            }
        }

        Ok(handler)
    }

    /// Begin a write transaction (blocks until the lock is free)
    pub fn write_transaction(&self) -> WriteTransaction<'_> {
        WriteTransaction::begin(self.pages.lock())
    }

    /// Begin a read transaction (blocks until the lock is free)
    pub fn read_transaction(&self) -> ReadTransaction<'_> {
        ReadTransaction::begin(self.pages.lock())
    }

    /// Fold committed WAL pages into the database file
    pub fn checkpoint(&self) -> Result<usize> {
        self.pages.lock().checkpoint()
    }

    /// Checkpoint and delete the WAL
    pub fn close(self) -> Result<()> {
        let mut pages = self.pages.into_inner();
        pages.checkpoint()?;
        if let Some(wal) = pages.wal.take() {
            wal.remove()?;
        }
        io::flush_and_sync(&mut pages.file)?;
        tracing::info!("Closed database {:?}", self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current meta page contents
    pub fn meta(&self) -> Meta {
        self.pages.lock().meta
    }

    /// Number of pages waiting to be reused
    pub fn free_page_count(&self) -> usize {
        self.pages.lock().free.len()
    }

    /// Next page address past the logical end of the file
    pub fn logical_end(&self) -> PageId {
        self.pages.lock().last_page
    }

    /// Pages with a committed WAL image not yet checkpointed
    pub fn wal_committed_pages(&self) -> usize {
        self.pages
            .lock()
            .wal
            .as_ref()
            .map_or(0, WriteAheadLog::committed_pages)
    }

    /// Page frames in the WAL, superseded ones included
    pub fn wal_page_frames(&self) -> usize {
        self.pages
            .lock()
            .wal
            .as_ref()
            .map_or(0, WriteAheadLog::page_frames)
    }
}

fn ragged_file(file_len: u64, page_size: usize) -> XlbError {
    XlbError::corrupt(
        0,
        format!(
            "file length {} is not a multiple of page size {}",
            file_len, page_size
        ),
    )
}

/// Stored sizes are authoritative; the requested order wins
fn reconcile(requested: &TreeConf, stored: &TreeConf) -> TreeConf {
    if requested.page_size != stored.page_size
        || requested.key_size != stored.key_size
        || requested.value_size != stored.value_size
    {
        tracing::debug!(
            "Ignoring requested sizes {:?}, file was created with {:?}",
            requested,
            stored
        );
    }
    TreeConf {
        order: requested.order,
        ..*stored
    }
}

impl Pages {
    // =========================================================================
    // Reads
    // =========================================================================

    /// Decoded node at `page`: cache, then WAL, then database file
    pub fn get_node(&mut self, page: PageId) -> Result<Node> {
        if page == 0 {
            return Err(XlbError::corrupt(0, "meta page is not a tree node"));
        }
        if let Some(node) = self.cache.get(page) {
            return Ok(node);
        }
        let raw = self.read_raw(page)?;
        let node = self.codec.decode(page, &raw)?;
        self.cache.set(page, node.clone());
        Ok(node)
    }

    /// Raw page image, bypassing the cache
    pub(crate) fn read_raw(&mut self, page: PageId) -> Result<Vec<u8>> {
        if let Some(wal) = self.wal.as_mut() {
            if let Some(image) = wal.get_page(page)? {
                return Ok(image);
            }
        }
        let page_size = self.meta.conf.page_size;
        let offset = page as u64 * page_size as u64;
        if offset + page_size as u64 > io::file_len(&self.file)? {
            return Err(XlbError::corrupt(page, "page is past the end of the file"));
        }
        io::read_exact_at(&mut self.file, page, offset, page_size)
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn conf(&self) -> &TreeConf {
        &self.meta.conf
    }

    // =========================================================================
    // Writes
    // =========================================================================
    //
    // Only reachable through a WriteTransaction, which holds the lock and
    // rolls these back unless it commits.

    /// Stage a node in the WAL and refresh its cache entry
    pub fn set_node(&mut self, node: Node) -> Result<()> {
        let page = node.page();
        if page == 0 {
            return Err(XlbError::corrupt(0, "cannot write a node over the meta page"));
        }
        let raw = self.codec.encode(&node)?;
        self.wal_mut()?.set_page(page, &raw)?;
        match node {
            Node::Free(_) => {
                self.cache.delete(page);
            }
            node => self.cache.set(page, node),
        }
        Ok(())
    }

    /// Smallest free page, or a new page at the logical end
    pub fn next_available_page(&mut self) -> Result<PageId> {
        if let Some(page) = self.free.pop() {
            tracing::trace!("Reusing free page {}", page);
            return Ok(page);
        }
        let page = self.last_page;
        self.last_page = page
            .checked_add(1)
            .ok_or_else(|| XlbError::corrupt(page, "page address space exhausted"))?;
        Ok(page)
    }

    /// Mark a page Free; it becomes reusable once the transaction commits
    pub fn free_page(&mut self, page: PageId) -> Result<()> {
        self.set_node(Node::Free(page))?;
        self.free.release(page);
        Ok(())
    }

    /// Persist a root node and point the meta page at it
    pub fn ensure_root_block(&mut self, root: Node) -> Result<()> {
        let page = root.page();
        self.set_node(root)?;
        if self.meta.root != page {
            tracing::debug!("Root moved from page {} to {}", self.meta.root, page);
            self.meta.root = page;
            self.write_meta()?;
        }
        Ok(())
    }

    /// Stage the meta page in the WAL
    pub fn write_meta(&mut self) -> Result<()> {
        let raw = self.meta.encode();
        self.wal_mut()?.set_page(0, &raw)
    }

    fn wal_mut(&mut self) -> Result<&mut WriteAheadLog> {
        self.wal
            .as_mut()
            .ok_or_else(|| XlbError::WalCorruption("WAL is already closed".to_string()))
    }

    // =========================================================================
    // Transaction boundaries
    // =========================================================================

    pub(crate) fn take_snapshot(&mut self) {
        self.snapshot = Some(Snapshot {
            meta: self.meta,
            free: self.free.clone(),
            last_page: self.last_page,
        });
    }

    /// Commit the WAL batch, then release pages freed by it
    pub(crate) fn commit_staged(&mut self) -> Result<()> {
        self.wal_mut()?.commit()?;
        self.free.commit();
        self.snapshot = None;
        Ok(())
    }

    /// Whether enough page frames piled up in the WAL to checkpoint
    pub(crate) fn wants_checkpoint(&self) -> bool {
        self.checkpoint_threshold > 0
            && self
                .wal
                .as_ref()
                .is_some_and(|wal| wal.page_frames() >= self.checkpoint_threshold)
    }

    /// Discard the WAL batch, forget cached nodes, restore the snapshot
    pub(crate) fn rollback_staged(&mut self) -> Result<()> {
        self.cache.clear();
        if let Some(snapshot) = self.snapshot.take() {
            self.meta = snapshot.meta;
            self.codec = NodeCodec::new(snapshot.meta.conf);
            self.free = snapshot.free;
            self.last_page = snapshot.last_page;
        }
        self.wal_mut()?.rollback()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Copy committed WAL pages into the file, fsync, then empty the WAL
    pub(crate) fn checkpoint(&mut self) -> Result<usize> {
        let page_size = self.meta.conf.page_size as u64;
        let Pages { file, wal, .. } = self;
        let Some(wal) = wal.as_mut() else {
            return Ok(0);
        };

        let written = wal.checkpoint(|page, image| {
            io::write_at(&mut *file, page as u64 * page_size, image, false)
        })?;
        io::flush_and_sync(file)?;
        wal.reset()?;

        if written > 0 {
            tracing::info!("Checkpoint wrote {} page(s) to the database file", written);
        }
        Ok(written)
    }

    /// Rebuild the free list from Free-tagged pages
    fn scan_free_pages(&mut self) -> Result<usize> {
        let mut found = 0;
        for page in 1..self.last_page {
            let raw = self.read_raw(page)?;
            if is_free_page(&raw) {
                self.free.insert(page);
                found += 1;
            }
        }
        Ok(found)
    }
}
