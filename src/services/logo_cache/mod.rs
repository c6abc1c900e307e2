//! Two-tier logo cache
//!
//! Logo bytes live in the durable blob tier; metadata lives in both the fast
//! key-value tier and as a JSON sidecar next to the blob. The metadata record
//! decides freshness, and a missing blob under fresh metadata is a plain miss.
//!
//! - `key`: the single key derivation used by both tiers
//! - `manager`: lookup / store / invalidate with staleness enforcement
//! - `headers`: HTTP cache header policy for cached and fetched logos

pub mod headers;
pub mod key;
pub mod manager;

pub use headers::CacheHeaderPolicy;
pub use key::CacheKey;
pub use manager::{CacheManager, CachedLogo};
