//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the unified legal search library, providing
//! structured error types and conversion utilities for all components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from configuration, providers and orchestration
//! - **Output**: Structured error types with context
//! - **Error Categories**: Configuration, Provider, Rate limiting, Search
//!
//! ## Key Features
//! - Hierarchical error types with detailed context
//! - Automatic conversion from common library errors
//! - Recoverability classification for retry decisions

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types for the unified legal search library
// Display and Error are implemented manually because several variants carry a
// `source: String` field, which the thiserror derive would treat as an error
// source and require to implement `std::error::Error`.
#[derive(Debug)]
pub enum SearchError {
    /// Configuration errors
    Config { message: String },

    /// Validation errors
    ValidationFailed { field: String, reason: String },

    /// Malformed or unusable search queries
    InvalidSearchQuery { query: String, reason: String },

    /// Rate limiting errors
    RateLimitExceeded {
        source: String,
        retry_after_ms: Option<u64>,
    },

    /// Network-related errors
    NetworkError { details: String },

    /// Data parsing errors
    DataParsing { source: String, details: String },

    /// Provider group timed out
    SearchTimeout { source: String, timeout_ms: u64 },

    /// Data source unavailable
    DataSourceUnavailable { source: String, details: String },

    /// Serialization/deserialization errors
    SerializationFailed { message: String },

    /// Internal system errors
    Internal { message: String },
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::Config { message } => write!(f, "Configuration error: {}", message),
            SearchError::ValidationFailed { field, reason } => {
                write!(f, "Validation failed for field '{}': {}", field, reason)
            }
            SearchError::InvalidSearchQuery { query, reason } => {
                write!(f, "Invalid search query: {} - {}", query, reason)
            }
            SearchError::RateLimitExceeded { source, .. } => {
                write!(f, "Rate limit exceeded for {}", source)
            }
            SearchError::NetworkError { details } => write!(f, "Network error: {}", details),
            SearchError::DataParsing { source, details } => {
                write!(f, "Failed to parse data from {}: {}", source, details)
            }
            SearchError::SearchTimeout { source, timeout_ms } => {
                write!(
                    f,
                    "Search timeout: {} took longer than {}ms",
                    source, timeout_ms
                )
            }
            SearchError::DataSourceUnavailable { source, details } => {
                write!(f, "Data source '{}' is unavailable: {}", source, details)
            }
            SearchError::SerializationFailed { message } => {
                write!(f, "Serialization failed: {}", message)
            }
            SearchError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for SearchError {}

impl SearchError {
    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::NetworkError { .. }
                | SearchError::RateLimitExceeded { .. }
                | SearchError::SearchTimeout { .. }
                | SearchError::DataSourceUnavailable { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SearchError::Config { .. } | SearchError::ValidationFailed { .. } => "configuration",
            SearchError::InvalidSearchQuery { .. } => "query",
            SearchError::RateLimitExceeded { .. } => "rate_limit",
            SearchError::NetworkError { .. }
            | SearchError::DataParsing { .. }
            | SearchError::DataSourceUnavailable { .. } => "provider",
            SearchError::SearchTimeout { .. } => "search",
            SearchError::SerializationFailed { .. } | SearchError::Internal { .. } => "generic",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::SerializationFailed {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::NetworkError {
            details: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SearchError {
    fn from(err: toml::de::Error) -> Self {
        SearchError::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}
