//! Parse cache for zoom mode
//!
//! Keeps the most recently zoomed files' trees keyed by path. An entry is
//! only valid for the content checksum it was built from; a lookup with a
//! different checksum drops it. Entries are immutable and handed out as
//! `Arc`s, so the lock only guards the LRU bookkeeping.

use crate::ir::File;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tree_sitter::Tree;

/// Default number of files kept
pub const DEFAULT_CAPACITY: usize = 64;

/// One cached parse
#[derive(Debug)]
pub struct CachedParse {
    /// Checksum of `source`
    pub checksum: String,
    pub tree: Tree,
    pub source: String,
    /// Zoom-mode file built from `tree`
    pub file: File,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// LRU cache of parsed files
pub struct TreeCache {
    entries: Mutex<LruCache<String, Arc<CachedParse>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TreeCache {
    /// Cache holding at most `capacity` files (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Entry for `path` if it was built from content with `checksum`
    pub fn get(&self, path: &str, checksum: &str) -> Option<Arc<CachedParse>> {
        let mut entries = self.entries.lock();
        let lookup = entries
            .get(path)
            .map(|entry| (entry.checksum == checksum).then(|| Arc::clone(entry)));
        let found = match lookup {
            Some(Some(entry)) => Some(entry),
            Some(None) => {
                entries.pop(path);
                tracing::debug!(path = %path, "cached parse is stale");
                None
            }
            None => None,
        };
        drop(entries);

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store an entry, replacing any previous one for `path`
    pub fn insert(&self, path: impl Into<String>, entry: CachedParse) -> Arc<CachedParse> {
        let entry = Arc::new(entry);
        self.entries.lock().put(path.into(), Arc::clone(&entry));
        entry
    }

    /// Cached entry, or build and store one
    ///
    /// `build` runs without the lock held; two racing builders for the same
    /// file both succeed and the later insert wins.
    pub fn get_or_insert_with<E>(
        &self,
        path: &str,
        checksum: &str,
        build: impl FnOnce() -> Result<CachedParse, E>,
    ) -> Result<Arc<CachedParse>, E> {
        if let Some(entry) = self.get(path, checksum) {
            return Ok(entry);
        }
        let entry = build()?;
        Ok(self.insert(path, entry))
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for TreeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
