//! Segment read cache
//!
//! Byte-bounded LRU of loaded segments, keyed by segment directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::Segment;

/// Shared cache of flushed segments
///
/// - LRU protected by Mutex (inserts happen once per flush, contention is low)
/// - Capacity is in bytes of [`Segment::byte_size`], not entries
pub struct SegmentCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: LruCache<PathBuf, Arc<Segment>>,
    usage: usize,
}

impl SegmentCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                usage: 0,
            }),
        }
    }

    /// Insert a segment, evicting least recently used ones until it fits.
    ///
    /// Returns false (and caches nothing) if the segment alone exceeds capacity.
    pub fn insert(&self, key: PathBuf, segment: Arc<Segment>) -> bool {
        let size = segment.byte_size();
        if size > self.capacity {
            tracing::debug!(key = %key.display(), size, capacity = self.capacity, "segment too large to cache");
            return false;
        }

        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.pop(&key) {
            inner.usage -= old.byte_size();
        }

        while inner.usage + size > self.capacity {
            match inner.entries.pop_lru() {
                Some((evicted, old)) => {
                    inner.usage -= old.byte_size();
                    tracing::trace!(key = %evicted.display(), "segment evicted");
                }
                None => break,
            }
        }

        inner.entries.put(key, segment);
        inner.usage += size;
        true
    }

    /// Look up a segment, marking it most recently used
    pub fn get(&self, key: &Path) -> Option<Arc<Segment>> {
        self.inner.lock().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &Path) -> bool {
        self.inner.lock().entries.contains(key)
    }

    /// Drop a segment, e.g. after its file was merged away
    pub fn erase(&self, key: &Path) -> Option<Arc<Segment>> {
        let mut inner = self.inner.lock();
        let removed = inner.entries.pop(key);
        if let Some(segment) = &removed {
            inner.usage -= segment.byte_size();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently held
    pub fn usage(&self) -> usize {
        self.inner.lock().usage
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
