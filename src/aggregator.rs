//! # Aggregator Module
//!
//! ## Purpose
//! Fans a query out to a group of provider adapters concurrently and flattens
//! their results. Two groups exist: the public sources and the commercial
//! subscription sources.
//!
//! ## Input/Output Specification
//! - **Input**: A search query and a member adapter list
//! - **Output**: Per-adapter results, or one flattened and ranked result
//! - **Failure policy**: Adapters are fail-soft, so a fan-out never errors;
//!   a broken member contributes an empty result
//!
//! ## Key Features
//! - Concurrent fan-out via `futures::future::join_all`
//! - Descending relevance ordering of the flattened list (the sort is stable,
//!   so ties keep adapter order, but that is not a promise callers may rely on)
//! - Aggregate `search_time_ms` reported as the maximum member stage time

use crate::config::Config;
use crate::errors::Result;
use crate::sources::commercial::CommercialSource;
use crate::sources::public::{BoeSource, CendojSource, EurLexSource};
use crate::sources::LegalSource;
use crate::{LegalDocument, SearchQuery, SearchResult};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Provenance label for the public group.
pub const PUBLIC_AGGREGATE: &str = "Public Aggregate";
/// Provenance label for the commercial group.
pub const COMMERCIAL_AGGREGATE: &str = "Commercial Aggregate";

/// A fixed group of provider adapters queried together.
pub struct SourceAggregator {
    label: &'static str,
    sources: Vec<Arc<dyn LegalSource>>,
}

impl SourceAggregator {
    pub fn new(label: &'static str, sources: Vec<Arc<dyn LegalSource>>) -> Self {
        Self { label, sources }
    }

    /// Build the public group (CENDOJ, BOE, EUR-Lex) from configuration.
    pub fn public_from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.providers.request_timeout_seconds);
        let max_results = config.search.max_results_per_source;
        let sources: Vec<Arc<dyn LegalSource>> = vec![
            Arc::new(CendojSource::new(
                config.providers.cendoj.clone(),
                timeout,
                max_results,
            )?),
            Arc::new(BoeSource::new(
                config.providers.boe.clone(),
                timeout,
                max_results,
            )?),
            Arc::new(EurLexSource::new(
                config.providers.eurlex.clone(),
                timeout,
                max_results,
            )?),
        ];
        Ok(Self::new(PUBLIC_AGGREGATE, sources))
    }

    /// Build the commercial group (Aranzadi, La Ley, vLex, Tirant) from
    /// configuration.
    pub fn commercial_from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.providers.request_timeout_seconds);
        let max_results = config.search.max_results_per_source;
        let sources: Vec<Arc<dyn LegalSource>> = vec![
            Arc::new(CommercialSource::aranzadi(
                config.providers.aranzadi.clone(),
                timeout,
                max_results,
            )?),
            Arc::new(CommercialSource::laley(
                config.providers.laley.clone(),
                timeout,
                max_results,
            )?),
            Arc::new(CommercialSource::vlex(
                config.providers.vlex.clone(),
                timeout,
                max_results,
            )?),
            Arc::new(CommercialSource::tirant(
                config.providers.tirant.clone(),
                timeout,
                max_results,
            )?),
        ];
        Ok(Self::new(COMMERCIAL_AGGREGATE, sources))
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn sources(&self) -> &[Arc<dyn LegalSource>] {
        &self.sources
    }

    /// Whether at least one member can reach its real upstream.
    pub fn any_configured(&self) -> bool {
        self.sources.iter().any(|source| source.is_configured())
    }

    /// Query every member concurrently. Cannot fail: members fail-soft.
    pub async fn search_all(&self, query: &SearchQuery) -> Vec<SearchResult> {
        join_all(self.sources.iter().map(|source| source.search(query))).await
    }

    /// Query every member and flatten into one ranked result.
    pub async fn search_combined(&self, query: &SearchQuery) -> SearchResult {
        let results = self.search_all(query).await;
        Self::combine(self.label, results)
    }

    /// Flatten member results, sort descending by relevance, report the
    /// maximum member stage time as the aggregate time.
    pub fn combine(label: &str, results: Vec<SearchResult>) -> SearchResult {
        let search_time_ms = results.iter().map(|r| r.search_time_ms).max().unwrap_or(0);
        let configured = results.iter().all(|r| r.configured);
        let mut documents: Vec<LegalDocument> =
            results.into_iter().flat_map(|r| r.documents).collect();
        documents.sort_by(|a, b| b.relevance.cmp(&a.relevance));

        let mut combined = SearchResult::new(documents, search_time_ms, label);
        combined.configured = configured;
        combined
    }

    /// Ask every member in turn for a document; first hit wins.
    pub async fn get_document(&self, id: &str) -> Option<LegalDocument> {
        for source in &self.sources {
            if let Some(doc) = source.get_document(id).await {
                return Some(doc);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DocumentType, SourceName};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct StaticSource {
        name: SourceName,
        result: SearchResult,
    }

    #[async_trait]
    impl LegalSource for StaticSource {
        fn name(&self) -> SourceName {
            self.name
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn search(&self, _query: &SearchQuery) -> SearchResult {
            self.result.clone()
        }

        async fn get_document(&self, id: &str) -> Option<LegalDocument> {
            self.result.documents.iter().find(|d| d.id == id).cloned()
        }
    }

    fn doc(id: &str, relevance: u8) -> LegalDocument {
        LegalDocument {
            id: id.to_string(),
            title: format!("Documento {}", id),
            court: "Tribunal Supremo".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            reference: format!("REF {}", id),
            summary: String::new(),
            full_text: None,
            relevance,
            tags: Vec::new(),
            jurisdiction: "ES".to_string(),
            document_type: DocumentType::Judgment,
            source: SourceName::Cendoj,
            url: None,
        }
    }

    fn source(name: SourceName, docs: Vec<LegalDocument>, time_ms: u64) -> Arc<dyn LegalSource> {
        Arc::new(StaticSource {
            name,
            result: SearchResult::new(docs, time_ms, name.as_str()),
        })
    }

    #[tokio::test]
    async fn combined_sorts_descending_by_relevance() {
        let aggregator = SourceAggregator::new(
            PUBLIC_AGGREGATE,
            vec![
                source(SourceName::Cendoj, vec![doc("a", 40), doc("b", 95)], 10),
                source(SourceName::Boe, vec![doc("c", 70)], 25),
            ],
        );
        let combined = aggregator
            .search_combined(&SearchQuery::text("plusvalía"))
            .await;

        let relevances: Vec<u8> = combined.documents.iter().map(|d| d.relevance).collect();
        assert_eq!(relevances, vec![95, 70, 40]);
        assert_eq!(combined.total_results, 3);
    }

    #[tokio::test]
    async fn combined_time_is_max_of_members() {
        let aggregator = SourceAggregator::new(
            PUBLIC_AGGREGATE,
            vec![
                source(SourceName::Cendoj, vec![], 10),
                source(SourceName::Boe, vec![], 120),
                source(SourceName::EurLex, vec![], 45),
            ],
        );
        let combined = aggregator.search_combined(&SearchQuery::text("q")).await;
        assert_eq!(combined.search_time_ms, 120);
        assert_eq!(combined.source, PUBLIC_AGGREGATE);
    }

    #[tokio::test]
    async fn search_all_returns_one_result_per_member() {
        let aggregator = SourceAggregator::new(
            COMMERCIAL_AGGREGATE,
            vec![
                source(SourceName::Aranzadi, vec![doc("a", 50)], 5),
                source(SourceName::Vlex, vec![], 5),
            ],
        );
        let results = aggregator.search_all(&SearchQuery::text("q")).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "Aranzadi");
        assert_eq!(results[1].source, "vLex");
    }

    #[tokio::test]
    async fn get_document_first_hit_wins() {
        let aggregator = SourceAggregator::new(
            PUBLIC_AGGREGATE,
            vec![
                source(SourceName::Cendoj, vec![doc("shared", 50)], 5),
                source(SourceName::Boe, vec![doc("shared", 20), doc("b", 30)], 5),
            ],
        );
        let hit = aggregator.get_document("shared").await.unwrap();
        assert_eq!(hit.relevance, 50);
        assert!(aggregator.get_document("missing").await.is_none());
    }
}
