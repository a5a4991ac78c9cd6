//! # Legal Data Sources Module
//!
//! ## Purpose
//! Defines the common interface for legal database providers and hosts the
//! concrete adapters: public sources (CENDOJ, BOE, EUR-Lex) and commercial
//! subscription providers (Aranzadi, La Ley, vLex, Tirant).
//!
//! ## Input/Output Specification
//! - **Input**: Generic search queries with filters and boolean operators
//! - **Output**: Standardized `SearchResult` values, one per provider
//! - **Failure policy**: `search` is fail-soft; errors degrade to empty
//!   results so one broken provider never aborts an aggregate search
//!
//! ## Architecture
//! - `LegalSource` trait: common interface for all providers
//! - `public.rs`: CENDOJ, BOE and EUR-Lex implementations
//! - `commercial.rs`: credential-gated subscription providers
//!
//! Adapters serve deterministic sample data unless configured for live
//! access (a `live` flag for public sources, an API key for commercial
//! ones). Live requests honor filters and boolean operators when building
//! the upstream query; sample data honors filters only.

pub mod commercial;
pub mod public;

use crate::{BooleanOperators, LegalDocument, SearchFilters, SearchQuery, SearchResult, SourceName};
use async_trait::async_trait;

/// Trait implemented by every legal database adapter.
#[async_trait]
pub trait LegalSource: Send + Sync {
    /// Provider identity.
    fn name(&self) -> SourceName;

    /// Whether the adapter can reach its real upstream. Public providers are
    /// always considered configured; commercial providers require an API key.
    fn is_configured(&self) -> bool;

    /// Execute a search. Never returns an error: internal failures are
    /// logged and converted into an empty result for this provider.
    async fn search(&self, query: &SearchQuery) -> SearchResult;

    /// Fetch a single document by provider-scoped id. Returns `None` on any
    /// failure or when the provider does not support direct retrieval.
    async fn get_document(&self, id: &str) -> Option<LegalDocument>;
}

/// Render the query text plus boolean operators as a single upstream search
/// expression, e.g. `despido AND improcedente NOT cautelar`.
pub(crate) fn build_expression(query: &SearchQuery) -> String {
    let mut expression = query.query.trim().to_string();
    if let Some(BooleanOperators { and, or, not }) = &query.operators {
        for term in and {
            expression.push_str(" AND ");
            expression.push_str(term);
        }
        for term in or {
            expression.push_str(" OR ");
            expression.push_str(term);
        }
        for term in not {
            expression.push_str(" NOT ");
            expression.push_str(term);
        }
    }
    expression
}

/// Apply structured filters to a document list. Used for sample data, where
/// there is no upstream to push the filters into.
pub(crate) fn apply_filters(
    documents: Vec<LegalDocument>,
    filters: Option<&SearchFilters>,
) -> Vec<LegalDocument> {
    let Some(filters) = filters else {
        return documents;
    };

    documents
        .into_iter()
        .filter(|doc| {
            if let Some(court) = &filters.court {
                if !doc.court.to_lowercase().contains(&court.to_lowercase()) {
                    return false;
                }
            }
            if let Some(from) = filters.date_from {
                if doc.date < from {
                    return false;
                }
            }
            if let Some(to) = filters.date_to {
                if doc.date > to {
                    return false;
                }
            }
            if let Some(jurisdiction) = &filters.jurisdiction {
                if !doc
                    .jurisdiction
                    .eq_ignore_ascii_case(jurisdiction)
                {
                    return false;
                }
            }
            if let Some(document_type) = filters.document_type {
                if doc.document_type != document_type {
                    return false;
                }
            }
            if !filters.tags.is_empty() {
                let any_tag = filters.tags.iter().any(|tag| doc.tags.contains(tag));
                if !any_tag {
                    return false;
                }
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentType;
    use chrono::NaiveDate;

    fn doc(court: &str, date: (i32, u32, u32), document_type: DocumentType) -> LegalDocument {
        LegalDocument {
            id: "X-1".to_string(),
            title: "Sample".to_string(),
            court: court.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            reference: "REF 1/2023".to_string(),
            summary: String::new(),
            full_text: None,
            relevance: 50,
            tags: vec!["laboral".to_string()],
            jurisdiction: "ES".to_string(),
            document_type,
            source: SourceName::Cendoj,
            url: None,
        }
    }

    #[test]
    fn expression_includes_operators_in_order() {
        let query = SearchQuery {
            query: "despido".to_string(),
            filters: None,
            operators: Some(BooleanOperators {
                and: vec!["improcedente".to_string()],
                or: vec!["nulo".to_string()],
                not: vec!["cautelar".to_string()],
            }),
        };
        assert_eq!(
            build_expression(&query),
            "despido AND improcedente OR nulo NOT cautelar"
        );
    }

    #[test]
    fn filters_narrow_by_type_and_date() {
        let docs = vec![
            doc("Tribunal Supremo", (2023, 3, 1), DocumentType::Judgment),
            doc("Tribunal Supremo", (2020, 1, 1), DocumentType::Judgment),
            doc("Tribunal Supremo", (2023, 5, 1), DocumentType::Law),
        ];
        let filters = SearchFilters {
            date_from: NaiveDate::from_ymd_opt(2022, 1, 1),
            document_type: Some(DocumentType::Judgment),
            ..Default::default()
        };
        let kept = apply_filters(docs, Some(&filters));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
    }

    #[test]
    fn missing_filters_keep_everything() {
        let docs = vec![doc("AN", (2023, 1, 1), DocumentType::Resolution)];
        assert_eq!(apply_filters(docs, None).len(), 1);
    }

    #[test]
    fn tag_filter_requires_any_match() {
        let docs = vec![doc("TS", (2023, 1, 1), DocumentType::Judgment)];
        let filters = SearchFilters {
            tags: vec!["mercantil".to_string()],
            ..Default::default()
        };
        assert!(apply_filters(docs, Some(&filters)).is_empty());
    }
}
