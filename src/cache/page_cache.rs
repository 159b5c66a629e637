//! PageCache implementation

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::config::DEFAULT_CACHE_SIZE;
use crate::storage::PageId;

/// LRU cache of decoded pages
pub struct PageCache<V> {
    entries: LruCache<PageId, V>,
}

impl<V: Clone> PageCache<V> {
    /// Create a cache holding at most `capacity` entries (0 means default)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(
            NonZeroUsize::new(DEFAULT_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
        );
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a page, marking it most recently used
    pub fn get(&mut self, page: PageId) -> Option<V> {
        self.entries.get(&page).cloned()
    }

    /// Insert or replace a page, evicting the LRU entry when full
    pub fn set(&mut self, page: PageId, value: V) {
        if let Some((evicted, _)) = self.entries.push(page, value) {
            if evicted != page {
                tracing::trace!("Page cache evicted page {}", evicted);
            }
        }
    }

    /// Drop a page from the cache
    pub fn delete(&mut self, page: PageId) -> Option<V> {
        self.entries.pop(&page)
    }

    /// Drop every page
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Whether a page is cached, without touching recency
    pub fn contains(&self, page: PageId) -> bool {
        self.entries.contains(&page)
    }
}
