//! Logo resolution entry point
//!
//! ```text
//! RateLimitCheck -> CacheLookup -> hit: respond
//!                              \-> miss/stale: ProviderFetch -> success: Store -> respond
//!                                                 \-> all failed & name only:
//!                                                     DomainResolve -> ProviderFetch (once)
//!                                                 \-> nothing: respond not found
//! ```
//!
//! Every request is independent. Two concurrent misses for the same key both
//! fetch and both store; the last write wins.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, DurableBackend};
use crate::errors::{AppError, AppResult};
use crate::models::{LogoMetadata, LogoRequest, LogoResponse, RateLimitDecision};
use crate::providers::{ProviderOrchestrator, ProviderRegistry, ResultRanker, build_http_client};
use crate::resolver::DomainResolver;
use crate::storage::{BlobStore, FilesystemBlobStore, KeyValueStore, MemoryBlobStore, MemoryKeyValueStore};

use super::logo_cache::{CacheKey, CacheManager, CachedLogo};
use super::rate_limiter::RateLimiter;

pub struct LogoResolutionService {
    cache: Arc<CacheManager>,
    orchestrator: Arc<ProviderOrchestrator>,
    resolver: Option<Arc<DomainResolver>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl LogoResolutionService {
    pub fn new(cache: Arc<CacheManager>, orchestrator: Arc<ProviderOrchestrator>) -> Self {
        Self {
            cache,
            orchestrator,
            resolver: None,
            rate_limiter: None,
        }
    }

    /// Resolver consulted for memoized name lookups; the orchestrator holds
    /// its own handle for the fallback
    pub fn with_resolver(mut self, resolver: Arc<DomainResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Build the stores named in `config` and wire everything up
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let fast: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let durable: Arc<dyn BlobStore> = match config.cache.durable_backend {
            DurableBackend::Memory => Arc::new(MemoryBlobStore::new()),
            DurableBackend::Filesystem => {
                Arc::new(FilesystemBlobStore::new(&config.cache.path).await?)
            }
        };
        info!(
            "Using {:?} durable tier and in-memory fast tier",
            config.cache.durable_backend
        );
        Self::from_parts(config, fast, durable)
    }

    /// Wire the service over caller-supplied stores
    pub fn from_parts(
        config: &Config,
        fast: Arc<dyn KeyValueStore>,
        durable: Arc<dyn BlobStore>,
    ) -> AppResult<Self> {
        let client = build_http_client(&config.orchestrator)?;
        let registry =
            ProviderRegistry::from_config(&config.providers, &config.orchestrator, client.clone())?;
        let mut orchestrator = ProviderOrchestrator::new(registry)
            .stop_on_first_success(config.orchestrator.stop_on_first_success);

        let cache = Arc::new(CacheManager::from_config(&config.cache, fast.clone(), durable));
        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit, fast.clone()));

        let resolver = config.resolver.enabled.then(|| {
            Arc::new(
                DomainResolver::from_config(&config.resolver, client, config.orchestrator.attempt_timeout)
                    .with_memo(fast, config.cache.max_age),
            )
        });
        if let Some(resolver) = &resolver {
            orchestrator = orchestrator.with_resolver(resolver.clone());
        }

        let mut service =
            Self::new(cache, Arc::new(orchestrator)).with_rate_limiter(rate_limiter);
        if let Some(resolver) = resolver {
            service = service.with_resolver(resolver);
        }
        Ok(service)
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn rate_limit_quota(&self) -> Option<u32> {
        self.rate_limiter.as_ref().map(|limiter| limiter.quota())
    }

    /// Resolve a logo, rate limiting by `client_key` when one is given
    pub async fn resolve(
        &self,
        request: LogoRequest,
        client_key: Option<&str>,
    ) -> AppResult<LogoResponse> {
        self.resolve_with_limit(request, client_key)
            .await
            .map(|(response, _)| response)
    }

    /// Like [`resolve`](Self::resolve), also returning the rate limit verdict
    pub async fn resolve_with_limit(
        &self,
        request: LogoRequest,
        client_key: Option<&str>,
    ) -> AppResult<(LogoResponse, Option<RateLimitDecision>)> {
        let request = request.normalized()?;

        let decision = match (client_key, &self.rate_limiter) {
            (Some(client_key), Some(limiter)) => Some(limiter.check(client_key).await),
            _ => None,
        };
        if let Some(decision) = decision
            && !decision.allowed
        {
            return Err(AppError::RateLimited {
                reset_at: decision.reset_at,
            });
        }

        Ok((self.resolve_unlimited(request).await, decision))
    }

    async fn resolve_unlimited(&self, request: LogoRequest) -> LogoResponse {
        if request.use_cache
            && let Some(hit) = self.lookup_cached(&request).await
        {
            return LogoResponse::cached(hit.bytes, hit.metadata);
        }

        let outcome = self.orchestrator.orchestrate(&request).await;
        let Some(winner) = ResultRanker::select(&outcome.successes) else {
            let summary = outcome
                .error_summary
                .unwrap_or_else(|| "no logo found".to_string());
            let identity = request.identity();
            info!(
                identity = identity.as_ref().map(|i| i.value()).unwrap_or_default(),
                "No logo found: {}", summary
            );
            return LogoResponse::not_found(summary);
        };

        let Some(metadata) = LogoMetadata::from_candidate(&outcome.request, winner) else {
            return LogoResponse::not_found("winning candidate carried no source URL");
        };
        debug!(
            provider = %winner.provider,
            identity = metadata.identity.value(),
            bytes = winner.byte_len,
            "Selected logo candidate"
        );

        if request.use_cache {
            match (&winner.bytes, CacheKey::for_request(&outcome.request)) {
                (Some(bytes), Some(key)) => {
                    if let Err(e) = self.cache.store(&key, bytes.clone(), &metadata).await {
                        warn!(cache_key = %key, "Failed to cache resolved logo: {}", e);
                    }
                }
                _ => debug!("Winning candidate has no bytes, not caching"),
            }
        }

        LogoResponse::fetched(winner.bytes.clone(), metadata)
    }

    /// Cache lookup under the request's own key, then (name-only requests)
    /// under the memoized domain's key
    async fn lookup_cached(&self, request: &LogoRequest) -> Option<CachedLogo> {
        if let Some(key) = CacheKey::for_request(request)
            && let Some(hit) = self.cache.lookup(&key).await
        {
            return Some(hit);
        }

        if !request.is_name_only() {
            return None;
        }
        let resolver = self.resolver.as_ref()?;
        let company = request.company_name.as_deref()?;
        let domain = resolver.memoized(company).await?;
        let key = CacheKey::for_request(&request.with_resolved_domain(&domain))?;
        self.cache.lookup(&key).await
    }

    /// Drop the cached entry for exactly this request's key
    pub async fn invalidate(&self, request: LogoRequest) -> AppResult<()> {
        let request = request.normalized()?;
        let key = CacheKey::for_request(&request)
            .ok_or_else(|| AppError::validation("request has no identity"))?;
        info!(cache_key = %key, "Invalidating cached logo");
        self.cache.invalidate(&key).await?;
        Ok(())
    }
}
