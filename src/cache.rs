//! # Query Cache Module
//!
//! ## Purpose
//! Bounded in-memory cache for search results, keyed by a canonical
//! serialization of the query. Entries expire lazily after a configurable
//! duration; when the cache is full the oldest-inserted entry is evicted.
//!
//! ## Input/Output Specification
//! - **Input**: Canonical query keys and combined search results
//! - **Output**: Cached results for unexpired keys, `None` otherwise
//! - **Eviction**: Insertion order (not access order), tracked explicitly
//!
//! ## Key Features
//! - Lazy expiration checked and deleted at read time, no background sweep
//! - Deterministic canonical keys from query + filters + operators
//! - Whole-cache clear for tests and manual invalidation

use crate::config::CacheConfig;
use crate::{SearchQuery, SearchResult};
use std::collections::{HashMap, VecDeque};
use tokio::time::{Duration, Instant};

/// Compute the canonical cache key for a query under a namespace.
///
/// Serialization is deterministic: struct fields serialize in declaration
/// order, so structurally equal queries always produce the same key. Operator
/// term lists are compared positionally, matching exact list equality.
pub fn canonical_key(namespace: &str, query: &SearchQuery) -> String {
    // Serialization of these derive-only types cannot fail.
    let body = serde_json::to_string(query).unwrap_or_default();
    format!("{}:{}", namespace, body)
}

struct CacheEntry {
    result: SearchResult,
    inserted_at: Instant,
}

/// Cache occupancy snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
}

/// Bounded TTL cache with insertion-order eviction.
pub struct QueryCache {
    enabled: bool,
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order; front is the eviction candidate.
    order: VecDeque<String>,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: Duration::from_millis(config.duration_ms),
            max_entries: config.max_entries,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Look up a key, deleting it if expired. Returns `None` when caching is
    /// disabled, the key is absent, or the entry aged out.
    pub fn get(&mut self, key: &str) -> Option<SearchResult> {
        if !self.enabled {
            return None;
        }

        let expired = match self.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
            None => return None,
        };

        if expired {
            tracing::debug!(key, "cache entry expired");
            self.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.result.clone())
    }

    /// Insert a result, evicting the oldest-inserted entry when at capacity.
    /// No-op when caching is disabled.
    pub fn insert(&mut self, key: String, result: SearchResult) {
        if !self.enabled {
            return;
        }

        // Re-inserting an existing key refreshes its insertion position.
        if self.entries.contains_key(&key) {
            self.remove(&key);
        }

        while self.entries.len() >= self.max_entries {
            if let Some(oldest) = self.order.pop_front() {
                tracing::debug!(key = %oldest, "evicting oldest cache entry");
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove all entries unconditionally.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_entries,
        }
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(enabled: bool, duration_ms: u64, max_entries: usize) -> QueryCache {
        QueryCache::new(&CacheConfig {
            enabled,
            duration_ms,
            max_entries,
        })
    }

    fn result(label: &str) -> SearchResult {
        SearchResult::empty(label, 5)
    }

    #[test]
    fn canonical_key_is_stable_for_equal_queries() {
        let a = SearchQuery::text("despido improcedente");
        let b = SearchQuery::text("despido improcedente");
        assert_eq!(canonical_key("unified", &a), canonical_key("unified", &b));
    }

    #[test]
    fn namespaces_do_not_collide() {
        let q = SearchQuery::text("plusvalía");
        assert_ne!(canonical_key("unified", &q), canonical_key("public", &q));
    }

    #[tokio::test]
    async fn round_trip() {
        let mut cache = cache(true, 60_000, 10);
        cache.insert("k1".to_string(), result("CENDOJ"));
        let hit = cache.get("k1").unwrap();
        assert_eq!(hit.source, "CENDOJ");
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let mut cache = cache(false, 60_000, 10);
        cache.insert("k1".to_string(), result("CENDOJ"));
        assert!(cache.get("k1").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut cache = cache(true, 10, 10);
        cache.insert("k1".to_string(), result("CENDOJ"));
        tokio::time::advance(Duration::from_millis(20)).await;
        assert!(cache.get("k1").is_none());
        // Lazy deletion removed the entry itself, not just hid it.
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn eviction_removes_oldest_inserted() {
        let mut cache = cache(true, 60_000, 3);
        cache.insert("k1".to_string(), result("a"));
        cache.insert("k2".to_string(), result("b"));
        cache.insert("k3".to_string(), result("c"));
        cache.insert("k4".to_string(), result("d"));

        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());
        assert!(cache.get("k4").is_some());
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn reinsert_refreshes_insertion_position() {
        let mut cache = cache(true, 60_000, 2);
        cache.insert("k1".to_string(), result("a"));
        cache.insert("k2".to_string(), result("b"));
        cache.insert("k1".to_string(), result("a2"));
        // k2 is now the oldest insertion, so it goes first.
        cache.insert("k3".to_string(), result("c"));

        assert!(cache.get("k2").is_none());
        assert_eq!(cache.get("k1").unwrap().source, "a2");
    }

    #[tokio::test]
    async fn clear_empties_the_cache() {
        let mut cache = cache(true, 60_000, 10);
        cache.insert("k1".to_string(), result("a"));
        cache.insert("k2".to_string(), result("b"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("k1").is_none());
    }
}
