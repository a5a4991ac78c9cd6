//! # Commercial Legal Data Sources
//!
//! ## Purpose
//! Adapters for the four subscription providers: Aranzadi, La Ley, vLex and
//! Tirant Lo Blanch. All four expose the same v1 REST shape here, so a single
//! adapter type covers them, parameterized by provider identity, endpoint and
//! credential.
//!
//! ## Input/Output Specification
//! - **Input**: Search queries plus a per-provider API key
//! - **Output**: Normalized `SearchResult` values, fail-soft on any error
//! - **Credential gate**: without an API key the adapter logs a warning and
//!   serves sample data marked `configured: false`, so callers can tell a
//!   demo answer from a real one

use super::{apply_filters, build_expression, LegalSource};
use crate::config::CommercialProviderConfig;
use crate::errors::{Result, SearchError};
use crate::utils::Timer;
use crate::{DocumentType, LegalDocument, SearchQuery, SearchResult, SourceName};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Adapter for a single commercial provider.
pub struct CommercialSource {
    name: SourceName,
    config: CommercialProviderConfig,
    client: Client,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct CommercialResponse {
    items: Vec<CommercialDoc>,
}

#[derive(Debug, Deserialize)]
struct CommercialDoc {
    id: String,
    title: String,
    court: Option<String>,
    date: String,
    citation: String,
    #[serde(rename = "abstract")]
    summary: Option<String>,
    full_text: Option<String>,
    /// Provider relevance on its own 0-100 scale
    score: Option<u32>,
    #[serde(default)]
    tags: Vec<String>,
    jurisdiction: Option<String>,
    doc_type: Option<DocumentType>,
    link: Option<String>,
}

impl CommercialSource {
    pub fn new(
        name: SourceName,
        config: CommercialProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        debug_assert!(name.is_commercial());
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("unified-legal-search/0.1")
            .build()
            .map_err(|e| SearchError::NetworkError {
                details: e.to_string(),
            })?;
        Ok(Self {
            name,
            config,
            client,
            max_results,
        })
    }

    pub fn aranzadi(
        config: CommercialProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        Self::new(SourceName::Aranzadi, config, timeout, max_results)
    }

    pub fn laley(
        config: CommercialProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        Self::new(SourceName::LaLey, config, timeout, max_results)
    }

    pub fn vlex(
        config: CommercialProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        Self::new(SourceName::Vlex, config, timeout, max_results)
    }

    pub fn tirant(
        config: CommercialProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        Self::new(SourceName::Tirant, config, timeout, max_results)
    }

    fn convert(&self, doc: CommercialDoc) -> Result<LegalDocument> {
        let date =
            NaiveDate::parse_from_str(&doc.date, "%Y-%m-%d").map_err(|e| SearchError::DataParsing {
                source: self.name.as_str().to_string(),
                details: format!("bad date '{}': {}", doc.date, e),
            })?;
        Ok(LegalDocument {
            id: doc.id,
            title: doc.title,
            court: doc.court.unwrap_or_default(),
            date,
            reference: doc.citation,
            summary: doc.summary.unwrap_or_default(),
            full_text: doc.full_text,
            relevance: doc.score.unwrap_or(0).min(100) as u8,
            tags: doc.tags,
            jurisdiction: doc.jurisdiction.unwrap_or_else(|| "ES".to_string()),
            document_type: doc.doc_type.unwrap_or(DocumentType::Judgment),
            source: self.name,
            url: doc.link,
        })
    }

    async fn remote_search(&self, query: &SearchQuery, api_key: &str) -> Result<Vec<LegalDocument>> {
        let url = format!("{}/search", self.config.base_url);
        debug!(provider = %self.name, url = %url, "querying commercial provider");

        let mut params = vec![
            ("q".to_string(), build_expression(query)),
            ("limit".to_string(), self.max_results.to_string()),
        ];
        if let Some(filters) = &query.filters {
            if let Some(court) = &filters.court {
                params.push(("court".to_string(), court.clone()));
            }
            if let Some(from) = filters.date_from {
                params.push(("from".to_string(), from.format("%Y-%m-%d").to_string()));
            }
            if let Some(to) = filters.date_to {
                params.push(("to".to_string(), to.format("%Y-%m-%d").to_string()));
            }
            if let Some(jurisdiction) = &filters.jurisdiction {
                params.push(("jurisdiction".to_string(), jurisdiction.clone()));
            }
            for tag in &filters.tags {
                params.push(("tag".to_string(), tag.clone()));
            }
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::NetworkError {
                details: format!("{} returned HTTP {}", self.name, response.status()),
            });
        }

        let payload: CommercialResponse =
            response.json().await.map_err(|e| SearchError::DataParsing {
                source: self.name.as_str().to_string(),
                details: e.to_string(),
            })?;

        payload.items.into_iter().map(|doc| self.convert(doc)).collect()
    }

    fn sample_results(&self, subject: &str) -> Vec<LegalDocument> {
        let (prefix, court, first, second, top, low) = match self.name {
            SourceName::Aranzadi => (
                "ARZ",
                "Tribunal Supremo. Sala de lo Social",
                "RJ 2023\\4411",
                "RJ 2022\\1287",
                92,
                83,
            ),
            SourceName::LaLey => (
                "LALEY",
                "Tribunal Superior de Justicia de Madrid",
                "LA LEY 90211/2023",
                "LA LEY 44520/2022",
                88,
                79,
            ),
            SourceName::Vlex => (
                "VLEX",
                "Tribunal Superior de Justicia de Cataluña",
                "VLEX-937201845",
                "VLEX-901558122",
                85,
                72,
            ),
            _ => (
                "TOL",
                "Audiencia Provincial de Valencia",
                "TOL9.612.884",
                "TOL9.233.017",
                80,
                69,
            ),
        };

        vec![
            LegalDocument {
                id: format!("{}-0001", prefix),
                title: format!("Doctrina consolidada sobre {}", subject),
                court: court.to_string(),
                date: ymd(2023, 10, 5),
                reference: first.to_string(),
                summary: format!("Análisis editorial y jurisprudencia seleccionada sobre {}", subject),
                full_text: None,
                relevance: top,
                tags: vec!["doctrina".to_string()],
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::Judgment,
                source: self.name,
                url: None,
            },
            LegalDocument {
                id: format!("{}-0002", prefix),
                title: format!("Comentario práctico en materia de {}", subject),
                court: court.to_string(),
                date: ymd(2022, 4, 19),
                reference: second.to_string(),
                summary: format!("Resolución comentada relativa a {}", subject),
                full_text: None,
                relevance: low,
                tags: vec!["comentario".to_string()],
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::Resolution,
                source: self.name,
                url: None,
            },
        ]
    }
}

#[async_trait]
impl LegalSource for CommercialSource {
    fn name(&self) -> SourceName {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult {
        let timer = Timer::new(format!("{}-search", self.name.as_str().to_lowercase()));

        let Some(api_key) = self.config.api_key.clone() else {
            warn!(provider = %self.name, "no API key configured, serving sample data");
            let documents = apply_filters(
                self.sample_results(&query.query),
                query.filters.as_ref(),
            );
            let mut result = SearchResult::new(documents, timer.stop(), self.name.as_str());
            result.configured = false;
            return result;
        };

        match self.remote_search(query, &api_key).await {
            Ok(documents) => SearchResult::new(documents, timer.stop(), self.name.as_str()),
            Err(e) => {
                warn!(provider = %self.name, error = %e, "search failed, returning empty result");
                SearchResult::empty(self.name.as_str(), timer.stop())
            }
        }
    }

    async fn get_document(&self, id: &str) -> Option<LegalDocument> {
        let Some(api_key) = self.config.api_key.clone() else {
            return self
                .sample_results("la consulta")
                .into_iter()
                .find(|doc| doc.id == id);
        };

        let url = format!("{}/documents/{}", self.config.base_url, id);
        let response = self.client.get(&url).bearer_auth(&api_key).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let doc: CommercialDoc = response.json().await.ok()?;
        self.convert(doc).ok()
    }
}
