//! In-process TTL cache for the taxonomy endpoints.
//!
//! Categories and hot tags change slowly and are read on every feed screen,
//! so they are cached with a fixed TTL and no write-path invalidation: a tag
//! used for the first time can lag the hot-tags list by up to its TTL.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::TagCount;

/// A minimal keyed cache where every entry expires `ttl` after insertion.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value if present and not expired. Expired entries
    /// are evicted on access.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: K, value: V) {
        self.entries.lock().insert(key, (Instant::now(), value));
    }
}

/// Shared cache instances for the category and tag listings
/// (categories 10 min, tags 5 min).
#[derive(Clone)]
pub struct TaxonomyCache {
    inner: Arc<TaxonomyCacheInner>,
}

struct TaxonomyCacheInner {
    categories: TtlCache<(), Vec<String>>,
    tags: TtlCache<i64, Vec<TagCount>>,
}

impl TaxonomyCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TaxonomyCacheInner {
                categories: TtlCache::new(Duration::from_secs(10 * 60)),
                tags: TtlCache::new(Duration::from_secs(5 * 60)),
            }),
        }
    }

    pub fn categories(&self) -> Option<Vec<String>> {
        self.inner.categories.get(&())
    }

    pub fn store_categories(&self, list: Vec<String>) {
        self.inner.categories.put((), list);
    }

    /// Tag listings are cached per requested limit.
    pub fn tags(&self, limit: i64) -> Option<Vec<TagCount>> {
        self.inner.tags.get(&limit)
    }

    pub fn store_tags(&self, limit: i64, list: Vec<TagCount>) {
        self.inner.tags.put(limit, list);
    }
}

impl Default for TaxonomyCache {
    fn default() -> Self {
        Self::new()
    }
}
