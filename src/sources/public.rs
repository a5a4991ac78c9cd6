//! # Public Legal Data Sources
//!
//! ## Purpose
//! Adapters for the freely accessible providers: CENDOJ (jurisprudence
//! registry of the Spanish judiciary), BOE (official state gazette) and
//! EUR-Lex (EU law portal).
//!
//! ## Input/Output Specification
//! - **Input**: Search queries with filters and boolean operators
//! - **Output**: Normalized `SearchResult` values, fail-soft on any error
//! - **Modes**: `live = false` serves deterministic sample data filtered
//!   locally; `live = true` issues a real HTTP request honoring filters and
//!   operators in the upstream query string
//!
//! Relevance scores are provider-assigned and not normalized across sources.

use super::{apply_filters, build_expression, LegalSource};
use crate::config::PublicProviderConfig;
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

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent("unified-legal-search/0.1")
        .build()
        .map_err(|e| SearchError::NetworkError {
            details: e.to_string(),
        })
}

/// Collect the upstream query parameters shared by all public providers.
fn query_params(query: &SearchQuery, max_results: usize) -> Vec<(String, String)> {
    let mut params = vec![
        ("q".to_string(), build_expression(query)),
        ("size".to_string(), max_results.to_string()),
    ];
    if let Some(filters) = &query.filters {
        if let Some(court) = &filters.court {
            params.push(("court".to_string(), court.clone()));
        }
        if let Some(from) = filters.date_from {
            params.push(("date_from".to_string(), from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = filters.date_to {
            params.push(("date_to".to_string(), to.format("%Y-%m-%d").to_string()));
        }
        if let Some(jurisdiction) = &filters.jurisdiction {
            params.push(("jurisdiction".to_string(), jurisdiction.clone()));
        }
        if let Some(document_type) = filters.document_type {
            let value = serde_json::to_string(&document_type)
                .unwrap_or_default()
                .trim_matches('"')
                .to_string();
            params.push(("type".to_string(), value));
        }
    }
    params
}

fn parse_date(source: SourceName, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| SearchError::DataParsing {
        source: source.as_str().to_string(),
        details: format!("bad date '{}': {}", raw, e),
    })
}

// ---------------------------------------------------------------------------
// CENDOJ
// ---------------------------------------------------------------------------

/// CENDOJ jurisprudence registry adapter.
pub struct CendojSource {
    config: PublicProviderConfig,
    client: Client,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct CendojResponse {
    resultados: Vec<CendojDoc>,
}

#[derive(Debug, Deserialize)]
struct CendojDoc {
    id: String,
    titulo: String,
    organo: String,
    fecha: String,
    roj: String,
    resumen: Option<String>,
    relevancia: Option<u32>,
    enlace: Option<String>,
}

impl CendojSource {
    pub fn new(
        config: PublicProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
            max_results,
        })
    }

    async fn remote_search(&self, query: &SearchQuery) -> Result<Vec<LegalDocument>> {
        let url = format!("{}/documents", self.config.base_url);
        debug!(url = %url, "querying CENDOJ");

        let response = self
            .client
            .get(&url)
            .query(&query_params(query, self.max_results))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::NetworkError {
                details: format!("CENDOJ returned HTTP {}", response.status()),
            });
        }

        let payload: CendojResponse =
            response.json().await.map_err(|e| SearchError::DataParsing {
                source: "CENDOJ".to_string(),
                details: e.to_string(),
            })?;

        payload
            .resultados
            .into_iter()
            .map(|doc| {
                Ok(LegalDocument {
                    date: parse_date(SourceName::Cendoj, &doc.fecha)?,
                    id: doc.id,
                    title: doc.titulo,
                    court: doc.organo,
                    reference: doc.roj,
                    summary: doc.resumen.unwrap_or_default(),
                    full_text: None,
                    relevance: doc.relevancia.unwrap_or(0).min(100) as u8,
                    tags: Vec::new(),
                    jurisdiction: "ES".to_string(),
                    document_type: DocumentType::Judgment,
                    source: SourceName::Cendoj,
                    url: doc.enlace,
                })
            })
            .collect()
    }

    fn sample_results(&self, subject: &str) -> Vec<LegalDocument> {
        vec![
            LegalDocument {
                id: "CENDOJ-0001".to_string(),
                title: format!("Sentencia del Tribunal Supremo sobre {}", subject),
                court: "Tribunal Supremo. Sala de lo Social".to_string(),
                date: ymd(2023, 9, 14),
                reference: "STS 2341/2023".to_string(),
                summary: format!("Recurso de casación para la unificación de doctrina en materia de {}", subject),
                full_text: None,
                relevance: 95,
                tags: vec!["laboral".to_string(), "casación".to_string()],
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::Judgment,
                source: SourceName::Cendoj,
                url: Some("https://www.poderjudicial.es/search/doc/STS-2341-2023".to_string()),
            },
            LegalDocument {
                id: "CENDOJ-0002".to_string(),
                title: format!("Sentencia de la Audiencia Nacional sobre {}", subject),
                court: "Audiencia Nacional. Sala de lo Social".to_string(),
                date: ymd(2023, 5, 30),
                reference: "SAN 512/2023".to_string(),
                summary: format!("Procedimiento de impugnación colectiva relativo a {}", subject),
                full_text: None,
                relevance: 87,
                tags: vec!["laboral".to_string()],
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::Judgment,
                source: SourceName::Cendoj,
                url: None,
            },
            LegalDocument {
                id: "CENDOJ-0003".to_string(),
                title: format!("Auto del Tribunal Supremo sobre {}", subject),
                court: "Tribunal Supremo. Sala de lo Social".to_string(),
                date: ymd(2024, 1, 22),
                reference: "ATS 98/2024".to_string(),
                summary: format!("Inadmisión de recurso en asunto de {}", subject),
                full_text: None,
                relevance: 76,
                tags: vec!["procesal".to_string()],
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::ProceduralOrder,
                source: SourceName::Cendoj,
                url: None,
            },
        ]
    }
}

#[async_trait]
impl LegalSource for CendojSource {
    fn name(&self) -> SourceName {
        SourceName::Cendoj
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult {
        let timer = Timer::new("cendoj-search");
        if self.config.live {
            match self.remote_search(query).await {
                Ok(documents) => SearchResult::new(documents, timer.stop(), self.name().as_str()),
                Err(e) => {
                    warn!(error = %e, "CENDOJ search failed, returning empty result");
                    SearchResult::empty(self.name().as_str(), timer.stop())
                }
            }
        } else {
            debug!("CENDOJ serving sample data");
            let documents = apply_filters(
                self.sample_results(&query.query),
                query.filters.as_ref(),
            );
            SearchResult::new(documents, timer.stop(), self.name().as_str())
        }
    }

    async fn get_document(&self, id: &str) -> Option<LegalDocument> {
        if self.config.live {
            let url = format!("{}/documents/{}", self.config.base_url, id);
            let response = self.client.get(&url).send().await.ok()?;
            if !response.status().is_success() {
                return None;
            }
            let doc: CendojDoc = response.json().await.ok()?;
            let date = parse_date(SourceName::Cendoj, &doc.fecha).ok()?;
            Some(LegalDocument {
                id: doc.id,
                title: doc.titulo,
                court: doc.organo,
                date,
                reference: doc.roj,
                summary: doc.resumen.unwrap_or_default(),
                full_text: None,
                relevance: doc.relevancia.unwrap_or(0).min(100) as u8,
                tags: Vec::new(),
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::Judgment,
                source: SourceName::Cendoj,
                url: doc.enlace,
            })
        } else {
            self.sample_results("la consulta")
                .into_iter()
                .find(|doc| doc.id == id)
        }
    }
}

// ---------------------------------------------------------------------------
// BOE
// ---------------------------------------------------------------------------

/// BOE official gazette adapter. Returns legislation rather than case law.
pub struct BoeSource {
    config: PublicProviderConfig,
    client: Client,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct BoeResponse {
    data: Vec<BoeDoc>,
}

#[derive(Debug, Deserialize)]
struct BoeDoc {
    identificador: String,
    titulo: String,
    departamento: String,
    fecha_publicacion: String,
    tipo: Option<String>,
    url_html: Option<String>,
}

impl BoeSource {
    pub fn new(
        config: PublicProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
            max_results,
        })
    }

    async fn remote_search(&self, query: &SearchQuery) -> Result<Vec<LegalDocument>> {
        let url = format!("{}/legislacion", self.config.base_url);
        debug!(url = %url, "querying BOE");

        let response = self
            .client
            .get(&url)
            .query(&query_params(query, self.max_results))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::NetworkError {
                details: format!("BOE returned HTTP {}", response.status()),
            });
        }

        let payload: BoeResponse =
            response.json().await.map_err(|e| SearchError::DataParsing {
                source: "BOE".to_string(),
                details: e.to_string(),
            })?;

        payload
            .data
            .into_iter()
            .map(|doc| {
                let document_type = match doc.tipo.as_deref() {
                    Some("ley") | Some("ley-organica") => DocumentType::Law,
                    Some("real-decreto") | Some("reglamento") => DocumentType::Regulation,
                    _ => DocumentType::Resolution,
                };
                Ok(LegalDocument {
                    date: parse_date(SourceName::Boe, &doc.fecha_publicacion)?,
                    reference: doc.identificador.clone(),
                    id: doc.identificador,
                    title: doc.titulo,
                    court: doc.departamento,
                    summary: String::new(),
                    full_text: None,
                    relevance: 0,
                    tags: Vec::new(),
                    jurisdiction: "ES".to_string(),
                    document_type,
                    source: SourceName::Boe,
                    url: doc.url_html,
                })
            })
            .collect()
    }

    fn sample_results(&self, subject: &str) -> Vec<LegalDocument> {
        vec![
            LegalDocument {
                id: "BOE-A-2023-18544".to_string(),
                title: format!("Real Decreto en materia de {}", subject),
                court: "Ministerio de Trabajo y Economía Social".to_string(),
                date: ymd(2023, 7, 11),
                reference: "BOE-A-2023-18544".to_string(),
                summary: format!("Disposición general que regula aspectos de {}", subject),
                full_text: None,
                relevance: 70,
                tags: vec!["legislación".to_string()],
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::Regulation,
                source: SourceName::Boe,
                url: Some("https://www.boe.es/diario_boe/txt.php?id=BOE-A-2023-18544".to_string()),
            },
            LegalDocument {
                id: "BOE-A-2022-09102".to_string(),
                title: format!("Ley reguladora sobre {}", subject),
                court: "Jefatura del Estado".to_string(),
                date: ymd(2022, 6, 2),
                reference: "BOE-A-2022-09102".to_string(),
                summary: format!("Norma con rango de ley aplicable a {}", subject),
                full_text: None,
                relevance: 64,
                tags: vec!["legislación".to_string()],
                jurisdiction: "ES".to_string(),
                document_type: DocumentType::Law,
                source: SourceName::Boe,
                url: None,
            },
        ]
    }
}

#[async_trait]
impl LegalSource for BoeSource {
    fn name(&self) -> SourceName {
        SourceName::Boe
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult {
        let timer = Timer::new("boe-search");
        if self.config.live {
            match self.remote_search(query).await {
                Ok(documents) => SearchResult::new(documents, timer.stop(), self.name().as_str()),
                Err(e) => {
                    warn!(error = %e, "BOE search failed, returning empty result");
                    SearchResult::empty(self.name().as_str(), timer.stop())
                }
            }
        } else {
            debug!("BOE serving sample data");
            let documents = apply_filters(
                self.sample_results(&query.query),
                query.filters.as_ref(),
            );
            SearchResult::new(documents, timer.stop(), self.name().as_str())
        }
    }

    async fn get_document(&self, id: &str) -> Option<LegalDocument> {
        // Direct retrieval is only available for sample data; the open data
        // API exposes documents through daily summaries instead.
        if self.config.live {
            return None;
        }
        self.sample_results("la consulta")
            .into_iter()
            .find(|doc| doc.id == id)
    }
}

// ---------------------------------------------------------------------------
// EUR-Lex
// ---------------------------------------------------------------------------

/// EUR-Lex EU law portal adapter.
pub struct EurLexSource {
    config: PublicProviderConfig,
    client: Client,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct EurLexResponse {
    results: Vec<EurLexDoc>,
}

#[derive(Debug, Deserialize)]
struct EurLexDoc {
    celex: String,
    title: String,
    author: Option<String>,
    date: String,
    summary: Option<String>,
    score: Option<f64>,
    uri: Option<String>,
}

impl EurLexSource {
    pub fn new(
        config: PublicProviderConfig,
        timeout: Duration,
        max_results: usize,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
            max_results,
        })
    }

    async fn remote_search(&self, query: &SearchQuery) -> Result<Vec<LegalDocument>> {
        let url = format!("{}/results", self.config.base_url);
        debug!(url = %url, "querying EUR-Lex");

        let response = self
            .client
            .get(&url)
            .query(&query_params(query, self.max_results))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::NetworkError {
                details: format!("EUR-Lex returned HTTP {}", response.status()),
            });
        }

        let payload: EurLexResponse =
            response.json().await.map_err(|e| SearchError::DataParsing {
                source: "EUR-Lex".to_string(),
                details: e.to_string(),
            })?;

        payload
            .results
            .into_iter()
            .map(|doc| {
                // EUR-Lex scores are 0.0-1.0; scale onto the shared 0-100 axis.
                let relevance = (doc.score.unwrap_or(0.0).clamp(0.0, 1.0) * 100.0) as u8;
                Ok(LegalDocument {
                    date: parse_date(SourceName::EurLex, &doc.date)?,
                    reference: doc.celex.clone(),
                    id: doc.celex,
                    title: doc.title,
                    court: doc.author.unwrap_or_else(|| "European Union".to_string()),
                    summary: doc.summary.unwrap_or_default(),
                    full_text: None,
                    relevance,
                    tags: Vec::new(),
                    jurisdiction: "EU".to_string(),
                    document_type: DocumentType::Regulation,
                    source: SourceName::EurLex,
                    url: doc.uri,
                })
            })
            .collect()
    }

    fn sample_results(&self, subject: &str) -> Vec<LegalDocument> {
        vec![
            LegalDocument {
                id: "62021CJ0311".to_string(),
                title: format!("Judgment of the Court concerning {}", subject),
                court: "Court of Justice of the European Union".to_string(),
                date: ymd(2023, 3, 2),
                reference: "ECLI:EU:C:2023:158".to_string(),
                summary: format!("Preliminary ruling touching on {}", subject),
                full_text: None,
                relevance: 81,
                tags: vec!["eu-law".to_string()],
                jurisdiction: "EU".to_string(),
                document_type: DocumentType::Judgment,
                source: SourceName::EurLex,
                url: Some("https://eur-lex.europa.eu/legal-content/EN/TXT/?uri=CELEX:62021CJ0311".to_string()),
            },
            LegalDocument {
                id: "32019L1152".to_string(),
                title: format!("Directive on transparent working conditions relevant to {}", subject),
                court: "European Parliament and Council".to_string(),
                date: ymd(2019, 6, 20),
                reference: "Directive (EU) 2019/1152".to_string(),
                summary: format!("Union legislation with bearing on {}", subject),
                full_text: None,
                relevance: 58,
                tags: vec!["eu-law".to_string(), "laboral".to_string()],
                jurisdiction: "EU".to_string(),
                document_type: DocumentType::Regulation,
                source: SourceName::EurLex,
                url: None,
            },
        ]
    }
}

#[async_trait]
impl LegalSource for EurLexSource {
    fn name(&self) -> SourceName {
        SourceName::EurLex
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> SearchResult {
        let timer = Timer::new("eurlex-search");
        if self.config.live {
            match self.remote_search(query).await {
                Ok(documents) => SearchResult::new(documents, timer.stop(), self.name().as_str()),
                Err(e) => {
                    warn!(error = %e, "EUR-Lex search failed, returning empty result");
                    SearchResult::empty(self.name().as_str(), timer.stop())
                }
            }
        } else {
            debug!("EUR-Lex serving sample data");
            let documents = apply_filters(
                self.sample_results(&query.query),
                query.filters.as_ref(),
            );
            SearchResult::new(documents, timer.stop(), self.name().as_str())
        }
    }

    async fn get_document(&self, id: &str) -> Option<LegalDocument> {
        if self.config.live {
            let url = format!("{}/document/{}", self.config.base_url, id);
            let response = self.client.get(&url).send().await.ok()?;
            if !response.status().is_success() {
                return None;
            }
            let doc: EurLexDoc = response.json().await.ok()?;
            let date = parse_date(SourceName::EurLex, &doc.date).ok()?;
            let relevance = (doc.score.unwrap_or(0.0).clamp(0.0, 1.0) * 100.0) as u8;
            Some(LegalDocument {
                reference: doc.celex.clone(),
                id: doc.celex,
                title: doc.title,
                court: doc.author.unwrap_or_else(|| "European Union".to_string()),
                date,
                summary: doc.summary.unwrap_or_default(),
                full_text: None,
                relevance,
                tags: Vec::new(),
                jurisdiction: "EU".to_string(),
                document_type: DocumentType::Regulation,
                source: SourceName::EurLex,
                url: doc.uri,
            })
        } else {
            self.sample_results("la consulta")
                .into_iter()
                .find(|doc| doc.id == id)
        }
    }
}
