//! # Rate Limiting Module
//!
//! ## Purpose
//! Sliding-window request throttling per logical source group. Two groups are
//! tracked in practice, `"public"` and `"commercial"`, so all providers in a
//! group share one quota.
//!
//! ## Input/Output Specification
//! - **Input**: Source group names, request timestamps
//! - **Output**: Allow/deny decisions over a trailing time window
//! - **Pruning**: Timestamps older than the window are discarded lazily at
//!   check time, there is no background sweep
//!
//! ## Key Features
//! - Best-effort, single-process limiting with no persistence
//! - Atomic `try_acquire` combining the check and the record so callers
//!   holding one lock cannot race past the quota

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use tokio::time::{Duration, Instant};

/// Logical source group for the public providers.
pub const SOURCE_PUBLIC: &str = "public";
/// Logical source group for the commercial providers.
pub const SOURCE_COMMERCIAL: &str = "commercial";

/// Sliding-window rate limiter keyed by source group name.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    history: HashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_millis(config.window_ms),
            history: HashMap::new(),
        }
    }

    /// Whether another request for `source` fits within the trailing window.
    /// Prunes expired timestamps as a side effect.
    pub fn can_make_request(&mut self, source: &str) -> bool {
        self.prune(source);
        self.count(source) < self.max_requests
    }

    /// Record a request for `source` at the current time.
    pub fn record_request(&mut self, source: &str) {
        self.history
            .entry(source.to_string())
            .or_default()
            .push(Instant::now());
    }

    /// Atomic check-and-record: returns true and records the request iff the
    /// quota allows it. Callers holding the limiter lock cannot interleave.
    pub fn try_acquire(&mut self, source: &str) -> bool {
        if !self.can_make_request(source) {
            tracing::debug!(source, "rate limit denied request");
            return false;
        }
        self.record_request(source);
        true
    }

    /// Milliseconds until the oldest recorded request leaves the window, for
    /// retry hints. `None` when no requests are recorded.
    pub fn retry_after_ms(&mut self, source: &str) -> Option<u64> {
        self.prune(source);
        let oldest = self.history.get(source)?.iter().min()?;
        let remaining = self.window.saturating_sub(oldest.elapsed());
        Some(remaining.as_millis() as u64)
    }

    fn count(&self, source: &str) -> usize {
        self.history.get(source).map_or(0, |stamps| stamps.len())
    }

    fn prune(&mut self, source: &str) {
        if let Some(stamps) = self.history.get_mut(source) {
            let window = self.window;
            stamps.retain(|stamp| stamp.elapsed() <= window);
        }
    }
}
