/// Configuration default values
///
/// All default values for configuration options live here so they can be
/// changed in one place.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Cache defaults
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60; // 30 days
pub const DEFAULT_FAST_TIER_TTL_SECS: u64 = 365 * 24 * 60 * 60; // 1 year
pub const DEFAULT_DURABLE_PATH: &str = "./data/logos";
/// Upper bound for cache lifetimes and the rate-limit window
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60; // 10 years

// Rate limiter defaults
pub const DEFAULT_RATE_LIMIT_QUOTA: u32 = 1000;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 3600;

// Provider orchestration defaults
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_USER_AGENT: &str = concat!("logo-resolver/", env!("CARGO_PKG_VERSION"));

// Request defaults and bounds
pub const DEFAULT_LOGO_SIZE: u32 = 128;
pub const MIN_LOGO_SIZE: u32 = 16;
pub const MAX_LOGO_SIZE: u32 = 2048;
