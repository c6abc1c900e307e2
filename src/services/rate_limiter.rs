//! Fixed-window request rate limiter
//!
//! Counters live in the shared key-value store under
//! `ratelimit:{client}:{window_start}` and expire with the window. The
//! read-then-increment is not atomic, so a burst of concurrent requests can
//! briefly exceed the quota; the limiter is advisory.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::errors::{StorageError, StorageResult};
use crate::models::RateLimitDecision;
use crate::storage::KeyValueStore;

const KEY_PREFIX: &str = "ratelimit";

/// Per-client quota enforcement over aligned time windows
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    quota: u32,
    window: Duration,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, quota: u32, window: Duration) -> Self {
        Self {
            store,
            quota,
            window: window.max(Duration::from_secs(1)),
            enabled: true,
        }
    }

    pub fn from_config(config: &RateLimitConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(store, config.quota, config.window)
        }
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// Check and count one request for `client_key` using the wall clock
    pub async fn check(&self, client_key: &str) -> RateLimitDecision {
        self.check_at(client_key, Utc::now()).await
    }

    /// Check and count one request for `client_key` as of `now`
    ///
    /// Storage failures allow the request.
    pub async fn check_at(&self, client_key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let (window_start, reset_at) = self.window_bounds(now);

        if !self.enabled {
            return RateLimitDecision {
                allowed: true,
                limit: self.quota,
                remaining: self.quota,
                reset_at,
            };
        }

        let counter_key = format!("{KEY_PREFIX}:{client_key}:{window_start}");
        match self.count_request(&counter_key).await {
            Ok(Some(new_count)) => {
                let remaining = self.quota.saturating_sub(new_count);
                debug!(client = client_key, count = new_count, remaining, "Rate limit check passed");
                RateLimitDecision {
                    allowed: true,
                    limit: self.quota,
                    remaining,
                    reset_at,
                }
            }
            Ok(None) => {
                debug!(client = client_key, %reset_at, "Rate limit exceeded");
                RateLimitDecision {
                    allowed: false,
                    limit: self.quota,
                    remaining: 0,
                    reset_at,
                }
            }
            Err(e) => {
                warn!(client = client_key, "Rate limit store failed, allowing request: {}", e);
                RateLimitDecision {
                    allowed: true,
                    limit: self.quota,
                    remaining: self.quota,
                    reset_at,
                }
            }
        }
    }

    /// Returns the new count, or `None` if the quota is already used up
    async fn count_request(&self, counter_key: &str) -> StorageResult<Option<u32>> {
        let current = match self.store.get(counter_key).await? {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                StorageError::backend("rate-limit", format!("corrupt counter '{raw}': {e}"))
            })?,
            None => 0,
        };

        if current >= self.quota {
            return Ok(None);
        }

        let new_count = current + 1;
        self.store
            .put(counter_key, new_count.to_string(), Some(self.window))
            .await?;
        Ok(Some(new_count))
    }

    /// `(window_start_secs, reset_at)` for the window containing `now`
    fn window_bounds(&self, now: DateTime<Utc>) -> (i64, DateTime<Utc>) {
        let window_secs = self.window.as_secs().max(1) as i64;
        let window_start = now.timestamp().div_euclid(window_secs) * window_secs;
        let reset_at = Utc
            .timestamp_opt(window_start + window_secs, 0)
            .single()
            .unwrap_or(now);
        (window_start, reset_at)
    }
}
