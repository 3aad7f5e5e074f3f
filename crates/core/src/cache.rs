//! In-memory cache for filtered message views.
//!
//! One bucket per provider, each bounded by a max entry count with LRU
//! eviction and a fixed entry lifespan independent of access. Bucket
//! isolation matters: clearing one provider's bucket on refresh must not
//! stall reads against another provider.
//!
//! Entirely in-memory; contents are lost on process restart, which is
//! fine because every entry is recomputable from the live message list.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::model::Message;

/// Default entry lifespan.
const DEFAULT_LIFESPAN: Duration = Duration::from_secs(30 * 60);

/// Default bound on entries per bucket.
const DEFAULT_MAX_ENTRIES: usize = 20_000;

/// A cached filtered view.
pub type CachedMessages = Arc<Vec<Message>>;

struct CacheEntry {
    value: CachedMessages,
    inserted: Instant,
    last_access: Instant,
}

impl CacheEntry {
    fn new(value: CachedMessages) -> Self {
        let now = Instant::now();
        Self { value, inserted: now, last_access: now }
    }

    fn is_expired(&self, lifespan: Duration) -> bool {
        self.inserted.elapsed() > lifespan
    }
}

#[derive(Default)]
struct Bucket {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

/// Per-provider message view cache with TTL and LRU eviction.
pub struct MessageCache {
    buckets: RwLock<HashMap<String, Arc<Bucket>>>,
    lifespan: Duration,
    max_entries: usize,
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_LIFESPAN)
    }
}

impl MessageCache {
    pub fn new(max_entries: usize, lifespan: Duration) -> Self {
        Self { buckets: RwLock::new(HashMap::new()), lifespan, max_entries }
    }

    fn bucket(&self, provider_id: &str) -> Arc<Bucket> {
        {
            let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(bucket) = buckets.get(provider_id) {
                return bucket.clone();
            }
        }
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        buckets.entry(provider_id.to_string()).or_default().clone()
    }

    /// Looks up a cached view, refreshing its access time on hit.
    /// Expired entries are dropped on access.
    pub fn get(&self, provider_id: &str, key: &str) -> Option<CachedMessages> {
        let bucket = self.bucket(provider_id);
        let mut entries = bucket.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.get(key).is_some_and(|entry| entry.is_expired(self.lifespan)) {
            entries.remove(key);
            return None;
        }

        entries.get_mut(key).map(|entry| {
            entry.last_access = Instant::now();
            entry.value.clone()
        })
    }

    /// Stores a view, evicting the least-recently-used entry if the
    /// bucket is full. A put racing a clear may be lost; that only costs
    /// a recomputation on the next miss.
    pub fn put(&self, provider_id: &str, key: String, value: CachedMessages) {
        let bucket = self.bucket(provider_id);
        let mut entries = bucket.entries.lock().unwrap_or_else(PoisonError::into_inner);

        entries.retain(|_, entry| !entry.is_expired(self.lifespan));

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let lru = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(k, _)| k.clone());
            if let Some(lru) = lru {
                entries.remove(&lru);
            }
        }

        entries.insert(key, CacheEntry::new(value));
    }

    /// Drops every entry in the provider's bucket. Other buckets are
    /// untouched and their reads are never blocked by the clear.
    pub fn clear(&self, provider_id: &str) {
        let bucket = self.bucket(provider_id);
        let mut entries = bucket.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        if dropped > 0 {
            tracing::debug!("cleared {} cached views for provider {}", dropped, provider_id);
        }
    }

    /// Number of live entries in the provider's bucket.
    pub fn len(&self, provider_id: &str) -> usize {
        let bucket = self.bucket(provider_id);
        let entries = bucket.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    pub fn is_empty(&self, provider_id: &str) -> bool {
        self.len(provider_id) == 0
    }
}
