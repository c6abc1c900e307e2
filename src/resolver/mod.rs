//! Company name to domain resolution
//!
//! Used as the fallback when every provider failed for a name-only request.
//! Strategies are tried in order and the first candidate that survives the
//! disallow-list wins. Successful resolutions are memoized in the key-value
//! store so repeat lookups for the same company skip the search entirely.

pub mod disallow;
pub mod strategies;

use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::observability::{AttemptAction, record_attempt};
use crate::storage::KeyValueStore;
use crate::utils::url::UrlUtils;

pub use disallow::{accept_candidate, is_disallowed};
pub use strategies::{HttpSearchStrategy, SearchStrategy, StrategyKind};

const MEMO_PREFIX: &str = "resolve";

struct Memo {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

/// Ordered chain of search strategies with an optional memo
pub struct DomainResolver {
    strategies: Vec<Arc<dyn SearchStrategy>>,
    memo: Option<Memo>,
}

impl DomainResolver {
    pub fn new(strategies: Vec<Arc<dyn SearchStrategy>>) -> Self {
        Self {
            strategies,
            memo: None,
        }
    }

    /// Remember resolutions in `store` for `ttl`
    pub fn with_memo(mut self, store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        self.memo = Some(Memo { store, ttl });
        self
    }

    pub fn from_config(config: &ResolverConfig, client: Client, request_timeout: Duration) -> Self {
        let strategies = config
            .strategies
            .iter()
            .filter(|s| s.enabled)
            .map(|s| {
                Arc::new(HttpSearchStrategy::from_config(s, client.clone(), request_timeout))
                    as Arc<dyn SearchStrategy>
            })
            .collect();
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    fn memo_key(company_name: &str) -> Option<String> {
        let slug = UrlUtils::slugify(company_name);
        (!slug.is_empty()).then(|| format!("{MEMO_PREFIX}:{slug}"))
    }

    /// Previously resolved domain for `company_name`, if memoized
    pub async fn memoized(&self, company_name: &str) -> Option<String> {
        let memo = self.memo.as_ref()?;
        let key = Self::memo_key(company_name)?;
        match memo.store.get(&key).await {
            Ok(value) => value.and_then(|domain| accept_candidate(&domain)),
            Err(e) => {
                warn!(company = company_name, "Domain memo lookup failed: {}", e);
                None
            }
        }
    }

    /// Resolve `company_name` to a domain, consulting the memo first
    pub async fn resolve(&self, company_name: &str) -> Option<String> {
        if let Some(domain) = self.memoized(company_name).await {
            debug!(company = company_name, domain = %domain, "Domain resolved from memo");
            return Some(domain);
        }

        for strategy in &self.strategies {
            let started = Instant::now();
            let outcome = strategy.candidates(company_name).await;
            let elapsed = started.elapsed();

            let candidates = match outcome {
                Ok(candidates) => candidates,
                Err(e) => {
                    record_attempt(strategy.name(), AttemptAction::ResolveDomain, company_name, elapsed, Some(e.to_string().as_str()));
                    continue;
                }
            };

            match candidates.iter().find_map(|raw| accept_candidate(raw)) {
                Some(domain) => {
                    record_attempt(strategy.name(), AttemptAction::ResolveDomain, company_name, elapsed, None);
                    self.remember(company_name, &domain).await;
                    return Some(domain);
                }
                None => {
                    let error = format!("no acceptable domain among {} candidates", candidates.len());
                    record_attempt(strategy.name(), AttemptAction::ResolveDomain, company_name, elapsed, Some(error.as_str()));
                }
            }
        }

        None
    }

    async fn remember(&self, company_name: &str, domain: &str) {
        let (Some(memo), Some(key)) = (self.memo.as_ref(), Self::memo_key(company_name)) else {
            return;
        };
        if let Err(e) = memo.store.put(&key, domain.to_string(), Some(memo.ttl)).await {
            warn!(company = company_name, "Failed to memoize resolved domain: {}", e);
        }
    }
}
