//! Bounded cache of decoded bundles
//!
//! EBX entries of binary bundles carry their payload inline, so resolving an
//! entry's GUID needs the decoded bundle it came from. Lookups cluster on
//! bundles seen moments earlier, which a small FIFO covers:
//! - linear lookup by `(toc path, bundle path)`
//! - misses are appended at the back
//! - the front entry is evicted once the length exceeds the capacity

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use frostcat_formats::bundle::DecodedBundle;
use tracing::trace;

/// Default number of cached bundles
pub const DEFAULT_BUNDLE_CACHE_CAPACITY: usize = 11;

/// Cache key: the TOC a bundle is listed in and the bundle's path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleKey {
    /// Path of the owning TOC
    pub toc_path: PathBuf,
    /// Bundle path within the TOC
    pub bundle_path: String,
}

impl BundleKey {
    /// Create a key
    pub fn new(toc_path: impl AsRef<Path>, bundle_path: impl Into<String>) -> Self {
        Self {
            toc_path: toc_path.as_ref().to_path_buf(),
            bundle_path: bundle_path.into(),
        }
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to decode
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
}

/// FIFO cache of decoded bundles
///
/// Not synchronized; each scan session or resolver owns its own.
#[derive(Debug)]
pub struct BundleCache {
    /// Oldest entry at the front.
    entries: VecDeque<(BundleKey, Arc<DecodedBundle>)>,
    capacity: usize,
    stats: CacheStats,
}

impl Default for BundleCache {
    fn default() -> Self {
        Self::new(DEFAULT_BUNDLE_CACHE_CAPACITY)
    }
}

impl BundleCache {
    /// Create a cache holding at most `capacity` bundles
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Cached bundle for `key`
    pub fn get(&mut self, key: &BundleKey) -> Option<Arc<DecodedBundle>> {
        let found = self
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, bundle)| Arc::clone(bundle));

        if found.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        found
    }

    /// Append `bundle`, evicting the oldest entries beyond capacity
    pub fn insert(&mut self, key: BundleKey, bundle: Arc<DecodedBundle>) {
        self.entries.push_back((key, bundle));
        while self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.pop_front() {
                trace!("evicted bundle {}", evicted.bundle_path);
                self.stats.evictions += 1;
            }
        }
    }

    /// Cached bundle for `key`, decoding and caching it on a miss
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &BundleKey,
        decode: impl FnOnce() -> Result<DecodedBundle, E>,
    ) -> Result<Arc<DecodedBundle>, E> {
        if let Some(bundle) = self.get(key) {
            return Ok(bundle);
        }
        let bundle = Arc::new(decode()?);
        self.insert(key.clone(), Arc::clone(&bundle));
        Ok(bundle)
    }

    /// Whether `key` is cached, without touching the counters
    pub fn contains(&self, key: &BundleKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Number of cached bundles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached bundles
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hit and miss counters
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
