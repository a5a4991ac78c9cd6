//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the unified legal search library: provider
//! endpoints and credentials, cache behavior, search limits and rate limiting,
//! loaded from TOML files with environment variable overrides and validation.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Range checks with detailed error messages
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)

use crate::errors::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure containing all library settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider endpoints and credentials
    pub providers: ProvidersConfig,
    /// Query cache behavior
    pub cache: CacheConfig,
    /// Search orchestration limits
    pub search: SearchConfig,
    /// Sliding-window rate limiting
    pub rate_limit: RateLimitConfig,
}

/// Endpoint and credential configuration for every provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Per-request HTTP timeout applied to every provider client
    pub request_timeout_seconds: u64,
    pub cendoj: PublicProviderConfig,
    pub boe: PublicProviderConfig,
    pub eurlex: PublicProviderConfig,
    pub aranzadi: CommercialProviderConfig,
    pub laley: CommercialProviderConfig,
    pub vlex: CommercialProviderConfig,
    pub tirant: CommercialProviderConfig,
}

/// A public provider: no credential, base URL is not secret
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicProviderConfig {
    /// API base URL
    pub base_url: String,
    /// Query the real endpoint instead of returning sample data
    pub live: bool,
}

impl Default for PublicProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            live: false,
        }
    }
}

/// A commercial provider: configured iff an API key is present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommercialProviderConfig {
    /// API base URL
    pub base_url: String,
    /// Subscription API key; absent means the adapter serves sample data
    pub api_key: Option<String>,
}

/// Query cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching
    pub enabled: bool,
    /// Time to live for cache entries (ms)
    pub duration_ms: u64,
    /// Maximum number of cached queries
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 3_600_000,
            max_entries: 100,
        }
    }
}

/// Search orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-source result cap; the combined result is capped at twice this
    pub max_results_per_source: usize,
    /// Per-branch timeout for aggregator calls (ms)
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results_per_source: 20,
            timeout_ms: 30_000,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per source group within the window
    pub max_requests: usize,
    /// Trailing window length (ms)
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60_000,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 10,
            cendoj: PublicProviderConfig {
                base_url: "https://www.poderjudicial.es/search".to_string(),
                live: false,
            },
            boe: PublicProviderConfig {
                base_url: "https://www.boe.es/datosabiertos/api".to_string(),
                live: false,
            },
            eurlex: PublicProviderConfig {
                base_url: "https://eur-lex.europa.eu/search".to_string(),
                live: false,
            },
            aranzadi: CommercialProviderConfig {
                base_url: "https://api.aranzadi.es/v1".to_string(),
                api_key: None,
            },
            laley: CommercialProviderConfig {
                base_url: "https://api.laleydigital.es/v1".to_string(),
                api_key: None,
            },
            vlex: CommercialProviderConfig {
                base_url: "https://api.vlex.com/v1".to_string(),
                api_key: None,
            },
            tirant: CommercialProviderConfig {
                base_url: "https://api.tirantonline.com/v1".to_string(),
                api_key: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| SearchError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // Commercial credentials
        if let Ok(key) = std::env::var("LEGAL_SEARCH_ARANZADI_API_KEY") {
            self.providers.aranzadi.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("LEGAL_SEARCH_LALEY_API_KEY") {
            self.providers.laley.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("LEGAL_SEARCH_VLEX_API_KEY") {
            self.providers.vlex.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("LEGAL_SEARCH_TIRANT_API_KEY") {
            self.providers.tirant.api_key = Some(key);
        }

        // Cache settings
        if let Ok(enabled) = std::env::var("LEGAL_SEARCH_CACHE_ENABLED") {
            self.cache.enabled = enabled.parse().map_err(|_| SearchError::Config {
                message: "Invalid boolean in LEGAL_SEARCH_CACHE_ENABLED".to_string(),
            })?;
        }
        if let Ok(duration) = std::env::var("LEGAL_SEARCH_CACHE_DURATION_MS") {
            self.cache.duration_ms = duration.parse().map_err(|_| SearchError::Config {
                message: "Invalid number in LEGAL_SEARCH_CACHE_DURATION_MS".to_string(),
            })?;
        }

        // Search settings
        if let Ok(timeout) = std::env::var("LEGAL_SEARCH_TIMEOUT_MS") {
            self.search.timeout_ms = timeout.parse().map_err(|_| SearchError::Config {
                message: "Invalid number in LEGAL_SEARCH_TIMEOUT_MS".to_string(),
            })?;
        }
        if let Ok(max) = std::env::var("LEGAL_SEARCH_MAX_RESULTS_PER_SOURCE") {
            self.search.max_results_per_source = max.parse().map_err(|_| SearchError::Config {
                message: "Invalid number in LEGAL_SEARCH_MAX_RESULTS_PER_SOURCE".to_string(),
            })?;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(SearchError::ValidationFailed {
                field: "cache.max_entries".to_string(),
                reason: "Cache capacity must be greater than zero".to_string(),
            });
        }
        if self.cache.duration_ms == 0 {
            return Err(SearchError::ValidationFailed {
                field: "cache.duration_ms".to_string(),
                reason: "Cache duration must be greater than zero".to_string(),
            });
        }
        if self.search.max_results_per_source == 0 {
            return Err(SearchError::ValidationFailed {
                field: "search.max_results_per_source".to_string(),
                reason: "Result cap must be greater than zero".to_string(),
            });
        }
        if self.search.timeout_ms == 0 {
            return Err(SearchError::ValidationFailed {
                field: "search.timeout_ms".to_string(),
                reason: "Search timeout must be greater than zero".to_string(),
            });
        }
        if self.rate_limit.max_requests == 0 {
            return Err(SearchError::ValidationFailed {
                field: "rate_limit.max_requests".to_string(),
                reason: "Rate limit quota must be greater than zero".to_string(),
            });
        }
        if self.rate_limit.window_ms == 0 {
            return Err(SearchError::ValidationFailed {
                field: "rate_limit.window_ms".to_string(),
                reason: "Rate limit window must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Per-branch aggregator timeout
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search.timeout_ms)
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SearchError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.duration_ms, 3_600_000);
        assert_eq!(config.search.timeout_ms, 30_000);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [cache]
            duration_ms = 5000

            [providers.aranzadi]
            api_key = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.duration_ms, 5000);
        assert!(config.cache.enabled);
        assert_eq!(config.providers.aranzadi.api_key.as_deref(), Some("secret"));
        assert!(config.providers.vlex.api_key.is_none());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = Config::default();
        config.cache.max_entries = 0;
        assert!(matches!(
            config.validate(),
            Err(SearchError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.search.max_results_per_source, 20);
    }
}
