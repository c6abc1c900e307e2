//! Service configuration
//!
//! Configuration is layered with figment: built-in defaults, then an optional
//! TOML file, then `LOGO_RESOLVER_*` environment variables (nested keys are
//! separated by `__`, e.g. `LOGO_RESOLVER_RATE_LIMIT__QUOTA=50`).

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::errors::{AppError, AppResult};
use crate::providers::ProviderKind;
use crate::resolver::StrategyKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Providers in priority order; attempts follow this order exactly
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Which implementation backs the durable blob tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurableBackend {
    /// Process-local; contents are lost on restart
    Memory,
    /// Files under `cache.path`
    #[default]
    Filesystem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entries older than this are stale and eagerly invalidated
    #[serde(default = "default_cache_max_age", with = "duration_serde::duration")]
    pub max_age: Duration,
    /// TTL applied to metadata records in the fast tier
    #[serde(default = "default_fast_tier_ttl", with = "duration_serde::duration")]
    pub fast_tier_ttl: Duration,
    #[serde(default)]
    pub durable_backend: DurableBackend,
    #[serde(default = "default_durable_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_quota")]
    pub quota: u32,
    #[serde(default = "default_window", with = "duration_serde::duration")]
    pub window: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on a single provider's verify request
    #[serde(default = "default_attempt_timeout", with = "duration_serde::duration")]
    pub attempt_timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    /// Stop the provider pass at the first success instead of ranking all of them
    #[serde(default)]
    pub stop_on_first_success: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides the provider's public endpoint (mirrors, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Opaque API token forwarded to providers that accept one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cache_max_age() -> Duration {
    Duration::from_secs(DEFAULT_CACHE_MAX_AGE_SECS)
}

fn default_fast_tier_ttl() -> Duration {
    Duration::from_secs(DEFAULT_FAST_TIER_TTL_SECS)
}

fn default_durable_path() -> PathBuf {
    PathBuf::from(DEFAULT_DURABLE_PATH)
}

fn default_quota() -> u32 {
    DEFAULT_RATE_LIMIT_QUOTA
}

fn default_window() -> Duration {
    Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS)
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_providers() -> Vec<ProviderConfig> {
    ProviderKind::ALL
        .iter()
        .map(|kind| ProviderConfig::new(*kind))
        .collect()
}

fn default_strategies() -> Vec<StrategyConfig> {
    StrategyKind::ALL
        .iter()
        .map(|kind| StrategyConfig {
            kind: *kind,
            enabled: true,
            base_url: None,
        })
        .collect()
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            enabled: true,
            base_url: None,
            token: None,
        }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age: default_cache_max_age(),
            fast_tier_ttl: default_fast_tier_ttl(),
            durable_backend: DurableBackend::default(),
            path: default_durable_path(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quota: default_quota(),
            window: default_window(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: default_attempt_timeout(),
            connect_timeout: default_connect_timeout(),
            stop_on_first_success: false,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategies: default_strategies(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            providers: default_providers(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Config {
    /// Load defaults, then the TOML file if present, then environment overrides
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if Path::new(config_file).exists() {
            info!("Loading configuration from {}", config_file);
            figment = figment.merge(Toml::file(config_file));
        } else {
            info!("Config file {} not found, using defaults", config_file);
        }
        let config: Config = figment
            .merge(Env::prefixed("LOGO_RESOLVER_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from {config_file}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.rate_limit.enabled && self.rate_limit.quota == 0 {
            return Err(AppError::configuration("rate_limit.quota must be at least 1"));
        }
        if self.rate_limit.window < Duration::from_secs(1) {
            return Err(AppError::configuration(
                "rate_limit.window must be at least one second",
            ));
        }
        let max_ttl = Duration::from_secs(MAX_TTL_SECS);
        for (name, value) in [
            ("cache.max_age", self.cache.max_age),
            ("cache.fast_tier_ttl", self.cache.fast_tier_ttl),
            ("rate_limit.window", self.rate_limit.window),
        ] {
            if value > max_ttl {
                return Err(AppError::configuration(format!(
                    "{name} must not exceed {}",
                    humantime::format_duration(max_ttl)
                )));
            }
        }
        for (name, value) in [
            ("cache.max_age", self.cache.max_age),
            ("cache.fast_tier_ttl", self.cache.fast_tier_ttl),
            ("orchestrator.attempt_timeout", self.orchestrator.attempt_timeout),
            ("orchestrator.connect_timeout", self.orchestrator.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(AppError::configuration(format!("{name} must be positive")));
            }
        }
        if !self.providers.iter().any(|p| p.enabled) {
            return Err(AppError::configuration("at least one provider must be enabled"));
        }
        Ok(())
    }
}
