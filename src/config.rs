//! Configuration for xiaolongbaodb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, XlbError};

/// Largest page size the 3-byte meta/WAL field can describe
pub const MAX_PAGE_SIZE: usize = (1 << 24) - 1;

/// Largest key size the 2-byte key length field can describe
pub const MAX_KEY_SIZE: usize = u16::MAX as usize;

/// Default number of decoded nodes held by the page cache
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Shape of the tree, persisted in the meta page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConf {
    /// B-tree order `m`: max children of an internal node
    pub order: usize,

    /// Bytes per page, fixed at creation
    pub page_size: usize,

    /// Max serialized key length, fixed at creation
    pub key_size: usize,

    /// Max inline value length; longer values go to overflow pages
    pub value_size: usize,
}

impl Default for TreeConf {
    fn default() -> Self {
        Self {
            order: 80,
            page_size: 8192,
            key_size: 16,
            value_size: 64,
        }
    }
}

// Leaf/internal node page: tag(1) + flags(1) + count(2)
pub(crate) const NODE_HEADER_SIZE: usize = 4;

// key_tag(1) + key_len(2)
pub(crate) const KEY_HEADER_SIZE: usize = 3;

// value_tag(1) + kind(1) + len(4)
pub(crate) const VALUE_HEADER_SIZE: usize = 6;

pub(crate) const PAGE_REF_SIZE: usize = 4;

impl TreeConf {
    /// Minimum entries in a non-root leaf
    pub fn min_leaf_entries(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    /// Maximum entries in a leaf
    pub fn max_leaf_entries(&self) -> usize {
        self.order - 1
    }

    /// Minimum children of a non-root internal node
    pub fn min_children(&self) -> usize {
        self.order.div_ceil(2)
    }

    /// Maximum children of an internal node
    pub fn max_children(&self) -> usize {
        self.order
    }

    /// Bytes of value payload one overflow page carries
    pub fn overflow_capacity(&self) -> usize {
        // tag(1) + next(4) + chunk_len(4)
        self.page_size - 9
    }

    /// Check that a full leaf and a full internal node fit in one page
    pub fn validate(&self) -> Result<()> {
        if self.order < 3 || self.order > u8::MAX as usize {
            return Err(XlbError::InvalidConfig(format!(
                "order must be between 3 and 255, got {}",
                self.order
            )));
        }
        if self.page_size > MAX_PAGE_SIZE || self.page_size < 64 {
            return Err(XlbError::InvalidConfig(format!(
                "page_size must be between 64 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        if self.key_size == 0 || self.key_size > MAX_KEY_SIZE {
            return Err(XlbError::InvalidConfig(format!(
                "key_size must be between 1 and {}, got {}",
                MAX_KEY_SIZE, self.key_size
            )));
        }
        if self.value_size == 0 || self.value_size > u32::MAX as usize {
            return Err(XlbError::InvalidConfig(format!(
                "value_size must be positive and fit in 4 bytes, got {}",
                self.value_size
            )));
        }

        let key = KEY_HEADER_SIZE + self.key_size;
        let value = VALUE_HEADER_SIZE + self.value_size.max(PAGE_REF_SIZE);
        let leaf = NODE_HEADER_SIZE + self.max_leaf_entries() * (key + value);
        let internal = NODE_HEADER_SIZE
            + (self.max_children() - 1) * key
            + self.max_children() * PAGE_REF_SIZE;

        let needed = leaf.max(internal);
        if needed > self.page_size {
            return Err(XlbError::InvalidConfig(format!(
                "a full node needs {} bytes but page_size is {}",
                needed, self.page_size
            )));
        }
        Ok(())
    }
}

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the database file. The WAL lives next to it:
    ///   {path}            (pages)
    ///   {path}.xdb.wal    (write-ahead log)
    pub path: PathBuf,

    /// Requested tree shape; sizes of an existing file take precedence
    pub tree: TreeConf,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Max decoded nodes in the page cache (0 means default)
    pub cache_size: usize,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Checkpoint once the WAL holds this many page frames, superseded and
    /// rolled back ones included (0 = only on close)
    pub checkpoint_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./xiaolongbao.db"),
            tree: TreeConf::default(),
            cache_size: DEFAULT_CACHE_SIZE,
            checkpoint_threshold: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Cache capacity with the non-positive fallback applied
    pub fn effective_cache_size(&self) -> usize {
        if self.cache_size == 0 {
            DEFAULT_CACHE_SIZE
        } else {
            self.cache_size
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the database file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the B-tree order
    pub fn order(mut self, order: usize) -> Self {
        self.config.tree.order = order;
        self
    }

    /// Set the page size (only honored when creating a file)
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.tree.page_size = size;
        self
    }

    /// Set the max key size (only honored when creating a file)
    pub fn key_size(mut self, size: usize) -> Self {
        self.config.tree.key_size = size;
        self
    }

    /// Set the max inline value size (only honored when creating a file)
    pub fn value_size(mut self, size: usize) -> Self {
        self.config.tree.value_size = size;
        self
    }

    /// Set the page cache capacity
    pub fn cache_size(mut self, entries: usize) -> Self {
        self.config.cache_size = entries;
        self
    }

    /// Set the WAL page-frame count that triggers a checkpoint
    pub fn checkpoint_threshold(mut self, frames: usize) -> Self {
        self.config.checkpoint_threshold = frames;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
