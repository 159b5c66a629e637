//! Page Cache Module
//!
//! Bounded in-memory map from page number to decoded node.
//!
//! ## Responsibilities
//! - Skip redundant reads/decodes for hot pages
//! - Bound memory by evicting the least-recently-used node
//! - Forget everything on rollback (cached nodes may be from an aborted write)
//!
//! ## Data Structure Choice
//! `lru::LruCache` (hash index + intrusive list): `get`, `set` and
//! `delete` are all O(1). Eviction is always lossless, the WAL or the
//! database file owns every page.

mod page_cache;

pub use page_cache::PageCache;
