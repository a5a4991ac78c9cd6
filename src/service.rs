//! # Unified Search Service Module
//!
//! ## Purpose
//! Top-level orchestrator for aggregated legal search. Consults the query
//! cache, fans out to the public and commercial aggregators under rate-limit
//! and timeout control, then merges, de-duplicates, ranks and caps the
//! combined result before caching it.
//!
//! ## Input/Output Specification
//! - **Input**: Search queries with optional filters and boolean operators
//! - **Output**: `UnifiedSearchResponse` with per-source breakdowns and one
//!   combined, ranked result; cache hits carry empty breakdowns
//! - **Failure policy**: A slow or denied provider group degrades to missing
//!   results, never to a failed search; only the narrow single-group entry
//!   points surface rate limiting as an error
//!
//! ## Key Features
//! - Cache-first lookup with namespace-prefixed canonical keys
//! - In-flight coalescing: concurrent identical queries perform one fetch
//! - Atomic rate-limit acquisition per source group
//! - Per-branch timeout racing that drops the slow branch without aborting
//!   the other, and without retrying within the call
//! - De-duplication by `(title, reference)`, public sources winning ties

use crate::aggregator::SourceAggregator;
use crate::cache::{canonical_key, CacheStats, QueryCache};
use crate::config::Config;
use crate::errors::{Result, SearchError};
use crate::rate_limit::{RateLimiter, SOURCE_COMMERCIAL, SOURCE_PUBLIC};
use crate::{LegalDocument, SearchQuery, SearchResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Provenance label for the merged cross-group result.
pub const UNIFIED_SOURCE: &str = "Unified";

const CACHE_NS_UNIFIED: &str = "unified";
const CACHE_NS_PUBLIC: &str = "public";
const CACHE_NS_COMMERCIAL: &str = "commercial";

/// Response of the combined search path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnifiedSearchResponse {
    /// Per-adapter results from the public group; empty on a cache hit.
    pub public: Vec<SearchResult>,
    /// Per-adapter results from the commercial group; empty on a cache hit.
    pub commercial: Vec<SearchResult>,
    /// Merged, de-duplicated, ranked and capped result.
    pub combined: SearchResult,
    /// Whether `combined` was served from the cache.
    pub from_cache: bool,
}

/// Configuration state of one provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceStatus {
    pub name: String,
    pub commercial: bool,
    pub configured: bool,
}

/// Top-level orchestrator owning the cache, the rate limiter and both
/// aggregator groups. Construct one per application; there is no implicit
/// global state, so tests can build and drop instances freely.
pub struct UnifiedSearchService {
    config: Config,
    public: SourceAggregator,
    commercial: SourceAggregator,
    cache: Mutex<QueryCache>,
    limiter: Mutex<RateLimiter>,
    /// Per-key gates for in-flight coalescing of identical queries.
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UnifiedSearchService {
    /// Build the service and both provider groups from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let public = SourceAggregator::public_from_config(&config)?;
        let commercial = SourceAggregator::commercial_from_config(&config)?;
        Ok(Self::with_aggregators(config, public, commercial))
    }

    /// Build the service around caller-supplied aggregators. Intended for
    /// tests and for embedders wiring custom `LegalSource` implementations.
    pub fn with_aggregators(
        config: Config,
        public: SourceAggregator,
        commercial: SourceAggregator,
    ) -> Self {
        let cache = QueryCache::new(&config.cache);
        let limiter = RateLimiter::new(&config.rate_limit);
        Self {
            config,
            public,
            commercial,
            cache: Mutex::new(cache),
            limiter: Mutex::new(limiter),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Combined search across both provider groups.
    ///
    /// Cache hit: returns immediately with `from_cache = true` and empty
    /// breakdowns. Cache miss: dispatches each group subject to its rate
    /// limit (the commercial group additionally requires at least one
    /// configured provider), races each branch against the configured
    /// timeout, merges whatever settled, caches and returns.
    pub async fn search_all(&self, query: &SearchQuery) -> Result<UnifiedSearchResponse> {
        self.validate(query)?;
        let key = canonical_key(CACHE_NS_UNIFIED, query);

        if let Some(combined) = self.cache.lock().await.get(&key) {
            debug!(key = %key, "unified cache hit");
            return Ok(Self::cached_response(combined));
        }

        // Coalesce concurrent identical queries: one caller fetches while the
        // rest wait on the gate and then hit the cache it filled.
        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(key.clone()).or_default())
        };
        let _guard = gate.lock().await;

        if let Some(combined) = self.cache.lock().await.get(&key) {
            debug!(key = %key, "unified cache hit after coalescing");
            self.release_gate(&key).await;
            return Ok(Self::cached_response(combined));
        }

        let public_allowed = self.limiter.lock().await.try_acquire(SOURCE_PUBLIC);
        if !public_allowed {
            info!("public group rate limited, skipping branch");
        }
        let commercial_configured = self.commercial.any_configured();
        let commercial_allowed =
            commercial_configured && self.limiter.lock().await.try_acquire(SOURCE_COMMERCIAL);
        if commercial_configured && !commercial_allowed {
            info!("commercial group rate limited, skipping branch");
        }

        let timeout = self.config.search_timeout();
        let public_branch = async {
            if !public_allowed {
                return None;
            }
            match tokio::time::timeout(timeout, self.public.search_all(query)).await {
                Ok(results) => Some(results),
                Err(_) => {
                    warn!(timeout_ms = timeout.as_millis() as u64, "public branch timed out");
                    None
                }
            }
        };
        let commercial_branch = async {
            if !commercial_allowed {
                return None;
            }
            match tokio::time::timeout(timeout, self.commercial.search_all(query)).await {
                Ok(results) => Some(results),
                Err(_) => {
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "commercial branch timed out"
                    );
                    None
                }
            }
        };

        let (public_results, commercial_results) = tokio::join!(public_branch, commercial_branch);
        let public_results = public_results.unwrap_or_default();
        let commercial_results = commercial_results.unwrap_or_default();

        let combined = self.merge(&public_results, &commercial_results);
        self.cache.lock().await.insert(key.clone(), combined.clone());
        self.release_gate(&key).await;

        info!(
            query = %crate::utils::truncate(&query.query, 80),
            total = combined.total_results,
            search_time_ms = combined.search_time_ms,
            "unified search completed"
        );

        Ok(UnifiedSearchResponse {
            public: public_results,
            commercial: commercial_results,
            combined,
            from_cache: false,
        })
    }

    /// Search only the public group. Unlike the combined path, a rate-limit
    /// denial surfaces as an explicit error here.
    pub async fn search_public_only(&self, query: &SearchQuery) -> Result<SearchResult> {
        self.single_group(query, CACHE_NS_PUBLIC, SOURCE_PUBLIC, &self.public)
            .await
    }

    /// Search only the commercial group. Providers without credentials answer
    /// with sample data flagged `configured: false`.
    pub async fn search_commercial_only(&self, query: &SearchQuery) -> Result<SearchResult> {
        self.single_group(query, CACHE_NS_COMMERCIAL, SOURCE_COMMERCIAL, &self.commercial)
            .await
    }

    /// Fetch a single document by provider-scoped id, public group first.
    pub async fn get_document(&self, id: &str) -> Option<LegalDocument> {
        if let Some(doc) = self.public.get_document(id).await {
            return Some(doc);
        }
        self.commercial.get_document(id).await
    }

    /// Configuration state of every provider adapter.
    pub fn source_status(&self) -> Vec<SourceStatus> {
        self.public
            .sources()
            .iter()
            .chain(self.commercial.sources().iter())
            .map(|source| SourceStatus {
                name: source.name().as_str().to_string(),
                commercial: source.name().is_commercial(),
                configured: source.is_configured(),
            })
            .collect()
    }

    /// Remove every cached entry.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    async fn single_group(
        &self,
        query: &SearchQuery,
        namespace: &str,
        limiter_source: &str,
        aggregator: &SourceAggregator,
    ) -> Result<SearchResult> {
        self.validate(query)?;
        let key = canonical_key(namespace, query);

        if let Some(hit) = self.cache.lock().await.get(&key) {
            debug!(key = %key, "single-group cache hit");
            return Ok(hit);
        }

        {
            let mut limiter = self.limiter.lock().await;
            if !limiter.try_acquire(limiter_source) {
                return Err(SearchError::RateLimitExceeded {
                    source: limiter_source.to_string(),
                    retry_after_ms: limiter.retry_after_ms(limiter_source),
                });
            }
        }

        let timeout = self.config.search_timeout();
        let combined = tokio::time::timeout(timeout, aggregator.search_combined(query))
            .await
            .map_err(|_| SearchError::SearchTimeout {
                source: limiter_source.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?;

        self.cache.lock().await.insert(key, combined.clone());
        Ok(combined)
    }

    /// Merge branch results: concatenate public before commercial, drop
    /// `(title, reference)` duplicates keeping the first occurrence, sort
    /// descending by relevance and cap at twice the per-source limit.
    fn merge(&self, public: &[SearchResult], commercial: &[SearchResult]) -> SearchResult {
        let all = public.iter().chain(commercial.iter());
        let search_time_ms = all
            .clone()
            .map(|result| result.search_time_ms)
            .max()
            .unwrap_or(0);
        let configured = all.clone().all(|result| result.configured);

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut documents: Vec<LegalDocument> = Vec::new();
        for result in all {
            for doc in &result.documents {
                if seen.insert(doc.dedup_key()) {
                    documents.push(doc.clone());
                }
            }
        }

        documents.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        documents.truncate(2 * self.config.search.max_results_per_source);

        let mut combined = SearchResult::new(documents, search_time_ms, UNIFIED_SOURCE);
        combined.configured = configured;
        combined
    }

    fn validate(&self, query: &SearchQuery) -> Result<()> {
        if query.query.trim().is_empty() {
            return Err(SearchError::InvalidSearchQuery {
                query: query.query.clone(),
                reason: "Query text must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn cached_response(combined: SearchResult) -> UnifiedSearchResponse {
        UnifiedSearchResponse {
            public: Vec::new(),
            commercial: Vec::new(),
            combined,
            from_cache: true,
        }
    }

    async fn release_gate(&self, key: &str) {
        self.in_flight.lock().await.remove(key);
    }
}
