//! HTTP cache header policy for logo responses

use chrono::SecondsFormat;

use crate::models::LogoMetadata;

/// Long-lived caching for content served from the cache
pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";
/// Freshly fetched logos may still be replaced by a better provider later
pub const CACHE_CONTROL_FETCHED: &str = "public, max-age=86400";
pub const CACHE_CONTROL_NOT_FOUND: &str = "no-store";
/// Exposes when the logo was retrieved; the provider name is never exposed
pub const RETRIEVED_AT_HEADER: &str = "x-logo-retrieved-at";
pub const CACHE_STATUS_HEADER: &str = "x-logo-cache";

/// Maps a resolution outcome to response headers
pub struct CacheHeaderPolicy;

impl CacheHeaderPolicy {
    pub fn for_logo(metadata: &LogoMetadata, from_cache: bool) -> Vec<(&'static str, String)> {
        let cache_control = if from_cache {
            CACHE_CONTROL_IMMUTABLE
        } else {
            CACHE_CONTROL_FETCHED
        };
        vec![
            ("cache-control", cache_control.to_string()),
            (
                RETRIEVED_AT_HEADER,
                metadata
                    .retrieved_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                CACHE_STATUS_HEADER,
                if from_cache { "hit" } else { "miss" }.to_string(),
            ),
        ]
    }

    pub fn for_not_found() -> Vec<(&'static str, String)> {
        vec![("cache-control", CACHE_CONTROL_NOT_FOUND.to_string())]
    }
}
