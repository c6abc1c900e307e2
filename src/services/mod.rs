//! Service layer
//!
//! - `logo_cache`: two-tier cache of logo bytes and metadata
//! - `rate_limiter`: fixed-window per-client quota
//! - `resolution`: the entry point tying cache, providers and resolver together

pub mod logo_cache;
pub mod rate_limiter;
pub mod resolution;

pub use logo_cache::{CacheHeaderPolicy, CacheKey, CacheManager, CachedLogo};
pub use rate_limiter::RateLimiter;
pub use resolution::LogoResolutionService;
