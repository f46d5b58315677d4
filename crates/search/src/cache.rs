//! Bounded recency cache of document vectors
//!
//! Holds the embedding and content of recently seen documents so a "related
//! documents" request can start from a known vector without a store round-trip.
//! Eviction is strict least-recently-used; reads and writes both count as use.

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use paperlens_common::metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Default number of documents kept
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

const CACHE_NAME: &str = "correlation";

/// Lookup of an id that is not cached. Never leaves the engine.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("document {id} is not cached")]
pub struct CacheMiss {
    pub id: String,
}

/// Cached vector and text of one document
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub embedding: Arc<[f32]>,
    pub content: String,
}

/// Process-local correlation cache shared by all in-flight requests.
///
/// Backed by a moka cache with the LRU policy. The mutex pairs every read or
/// write with its maintenance pass, so recency is applied in call order and
/// an eviction happens before the next caller looks. It is never held across
/// an `.await`.
pub struct CorrelationCache {
    inner: Mutex<Cache<String, CachedDocument>>,
    evictions: Arc<AtomicU64>,
    capacity: usize,
}

impl CorrelationCache {
    /// Create a cache holding at most `capacity` documents (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let evictions = Arc::new(AtomicU64::new(0));

        let cache = Cache::builder()
            .max_capacity(capacity as u64)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener({
                let evictions = Arc::clone(&evictions);
                move |id: Arc<String>, _doc: CachedDocument, cause: RemovalCause| {
                    if cause == RemovalCause::Size {
                        evictions.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(evicted = %id, "Correlation cache eviction");
                    }
                }
            })
            .build();

        Self {
            inner: Mutex::new(cache),
            evictions,
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cache<String, CachedDocument>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache `id`, replacing any previous entry and evicting the least
    /// recently used document when full.
    pub fn set(&self, id: &str, embedding: Arc<[f32]>, content: String) {
        let (evicted, len) = {
            let cache = self.lock();
            let before = self.evictions.load(Ordering::Relaxed);
            cache.insert(id.to_string(), CachedDocument { embedding, content });
            cache.run_pending_tasks();
            (
                self.evictions.load(Ordering::Relaxed) > before,
                cache.entry_count() as usize,
            )
        };

        metrics::record_cache_size(CACHE_NAME, len, evicted);
    }

    /// Fetch the cached vector and content of `id`, marking it most recently used
    pub fn get(&self, id: &str) -> Result<CachedDocument, CacheMiss> {
        let hit = {
            let cache = self.lock();
            let hit = cache.get(id);
            cache.run_pending_tasks();
            hit
        };
        metrics::record_cache(hit.is_some(), CACHE_NAME);
        hit.ok_or_else(|| CacheMiss { id: id.to_string() })
    }

    /// Membership test that does not touch recency
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        let cache = self.lock();
        cache.run_pending_tasks();
        cache.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CorrelationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
