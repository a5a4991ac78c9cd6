//! # Unified Legal Search Aggregation
//!
//! ## Overview
//! This library aggregates search over heterogeneous legal databases: three
//! public sources (CENDOJ jurisprudence registry, the BOE official gazette,
//! and the EUR-Lex portal) and four commercial subscription providers
//! (Aranzadi, La Ley, vLex, Tirant). A single query is fanned out to every
//! available source, and the results are merged, de-duplicated, ranked and
//! cached behind one entry point.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `sources`: per-provider adapters implementing the `LegalSource` trait
//! - `aggregator`: public/commercial fan-out and result flattening
//! - `cache`: bounded TTL cache keyed by canonicalized queries
//! - `rate_limit`: sliding-window throttling per source group
//! - `service`: the unified orchestrator tying the above together
//! - `config`: configuration management and settings
//! - `errors`: centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: free-text queries with optional filters and boolean operators
//! - **Output**: ranked, de-duplicated document lists with per-source breakdowns
//! - **Resilience**: a failing or slow provider degrades to empty results,
//!   never to a failed search
//!
//! ## Usage
//! ```rust,no_run
//! use unified_legal_search::{Config, SearchQuery, UnifiedSearchService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let service = UnifiedSearchService::new(config)?;
//!     let response = service.search_all(&SearchQuery::text("despido improcedente")).await?;
//!     println!("Found {} results", response.combined.total_results);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod aggregator;
pub mod cache;
pub mod config;
pub mod errors;
pub mod rate_limit;
pub mod service;
pub mod sources;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, SearchError};
pub use service::{UnifiedSearchResponse, UnifiedSearchService};
pub use sources::LegalSource;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a legal data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceName {
    /// CENDOJ, the Spanish judiciary's jurisprudence registry
    Cendoj,
    /// BOE, the Spanish official state gazette
    Boe,
    /// EUR-Lex, the EU law portal
    EurLex,
    /// Aranzadi (commercial)
    Aranzadi,
    /// La Ley (commercial)
    LaLey,
    /// vLex (commercial)
    Vlex,
    /// Tirant Lo Blanch (commercial)
    Tirant,
}

impl SourceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Cendoj => "CENDOJ",
            SourceName::Boe => "BOE",
            SourceName::EurLex => "EUR-Lex",
            SourceName::Aranzadi => "Aranzadi",
            SourceName::LaLey => "La Ley",
            SourceName::Vlex => "vLex",
            SourceName::Tirant => "Tirant",
        }
    }

    /// Whether this provider requires a subscription credential.
    pub fn is_commercial(&self) -> bool {
        matches!(
            self,
            SourceName::Aranzadi | SourceName::LaLey | SourceName::Vlex | SourceName::Tirant
        )
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taxonomy of legal document kinds understood by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Judgment,
    ProceduralOrder,
    Resolution,
    Law,
    Regulation,
}

/// A single document returned by a provider.
///
/// `id` is scoped to its source: two providers may use the same identifier
/// for unrelated documents. Cross-source identity for de-duplication is the
/// `(title, reference)` pair instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegalDocument {
    pub id: String,
    pub title: String,
    pub court: String,
    pub date: NaiveDate,
    /// Citation string, e.g. "STS 2341/2023"
    pub reference: String,
    pub summary: String,
    pub full_text: Option<String>,
    /// Provider-assigned relevance, 0-100. Scales are not normalized across
    /// providers, so cross-source ranking is approximate.
    pub relevance: u8,
    pub tags: Vec<String>,
    pub jurisdiction: String,
    pub document_type: DocumentType,
    pub source: SourceName,
    pub url: Option<String>,
}

impl LegalDocument {
    /// De-duplication key: documents with the same title and citation are
    /// treated as one, whichever provider returned them.
    pub fn dedup_key(&self) -> (String, String) {
        (self.title.clone(), self.reference.clone())
    }
}

/// Structured constraints narrowing a search.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilters {
    pub court: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub jurisdiction: Option<String>,
    pub document_type: Option<DocumentType>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Boolean composition hints. Honored when building real upstream requests;
/// simulated responses ignore them. Cache identity uses exact list equality,
/// so reordering terms produces a distinct cache entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BooleanOperators {
    #[serde(default)]
    pub and: Vec<String>,
    #[serde(default)]
    pub or: Vec<String>,
    #[serde(default)]
    pub not: Vec<String>,
}

/// Input to every adapter and to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub filters: Option<SearchFilters>,
    pub operators: Option<BooleanOperators>,
}

impl SearchQuery {
    /// Plain free-text query with no filters or operators.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: None,
            operators: None,
        }
    }
}

/// Output of an adapter, an aggregator, or the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub documents: Vec<LegalDocument>,
    /// Always `documents.len()` at construction time.
    pub total_results: usize,
    /// Elapsed milliseconds for this stage. Combined results report the
    /// maximum of their constituent stage times, not the wall-clock total.
    pub search_time_ms: u64,
    /// Provenance label: a provider name or an aggregate label.
    pub source: String,
    /// False when a commercial provider answered with sample data because no
    /// credential is configured.
    pub configured: bool,
}

impl SearchResult {
    pub fn new(
        documents: Vec<LegalDocument>,
        search_time_ms: u64,
        source: impl Into<String>,
    ) -> Self {
        let total_results = documents.len();
        Self {
            documents,
            total_results,
            search_time_ms,
            source: source.into(),
            configured: true,
        }
    }

    /// Fail-soft result: zero documents under the given provenance label.
    pub fn empty(source: impl Into<String>, search_time_ms: u64) -> Self {
        Self::new(Vec::new(), search_time_ms, source)
    }
}
