//! # xiaolongbaodb
//!
//! An embedded, single-file key-value store with:
//! - A disk-backed B-tree over fixed-size pages
//! - Write-Ahead Logging (WAL) for atomic, crash-safe commits
//! - Crash recovery that drops torn and uncommitted frames
//! - A bounded LRU cache of decoded pages
//! - Free-page reclamation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         BTree                               │
//! │          get / insert / delete / range / checkpoint         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one transaction per operation
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     FileHandler                             │
//! │     (global lock, free-page list, meta page, node codec)    │
//! └──────┬──────────────────────┬──────────────────────┬────────┘
//!        │                      │                      │
//!        ▼                      ▼                      ▼
//! ┌─────────────┐        ┌─────────────┐        ┌─────────────┐
//! │  PageCache  │        │     WAL     │        │  Database   │
//! │    (LRU)    │        │  .xdb.wal   │──────▶ │    file     │
//! └─────────────┘        └─────────────┘ ckpt   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod io;

pub mod cache;
pub mod wal;
pub mod node;
pub mod storage;
pub mod btree;
pub mod serializer;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use btree::{BTree, RangeIter};
pub use config::{Config, TreeConf};
pub use error::{Result, XlbError};
pub use serializer::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of xiaolongbaodb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
