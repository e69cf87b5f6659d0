//! Bounded least-recently-used caches for pages and pictures.

use crate::error::{PixurError, Result};
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Default capacity of the anchor → page cache.
pub const DEFAULT_PAGE_CACHE_CAPACITY: usize = 20;

/// Default capacity of the id → pic cache. Covers a few pages in both
/// scroll directions.
pub const DEFAULT_PIC_CACHE_CAPACITY: usize = 240;

/// Statistics for cache hits/misses
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Number of evictions caused by inserts over capacity
    pub evictions: usize,
    /// Entries currently held
    pub len: usize,
    /// Maximum number of entries
    pub capacity: usize,
}

/// A key → value store that never holds more than `capacity` entries.
///
/// `get` counts as a use; inserting a new key into a full cache drops the
/// entry that was used least recently.
pub struct CappedCache<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    hits: usize,
    misses: usize,
    evictions: usize,
}

impl<K: Hash + Eq, V: Clone> CappedCache<K, V> {
    /// Creates an empty cache.
    ///
    /// # Errors
    ///
    /// Returns `PixurError::Config` for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| PixurError::config("cache capacity must be greater than zero"))?;
        Ok(Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        })
    }

    /// Returns a copy of the value and marks the key as most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts or overwrites `key`, evicting the least recently used entry
    /// if a new key would exceed capacity.
    pub fn put(&mut self, key: K, value: V) {
        // `push` hands back the displaced pair; an overwrite of the same key
        // is not an eviction.
        if let Some((old_key, _)) = self.entries.push(key, value)
            && !self.entries.contains(&old_key)
        {
            self.evictions += 1;
        }
    }

    /// Checks for a key without touching its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Removes every entry. Counters are kept.
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

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.len(),
            capacity: self.capacity(),
        }
    }
}
