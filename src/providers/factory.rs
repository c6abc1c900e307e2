//! Provider registry built once from configuration

use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::config::{OrchestratorConfig, ProviderConfig};
use crate::errors::{AppError, AppResult};

use super::http::HttpLogoProvider;
use super::traits::LogoProvider;

/// Enabled providers in declared priority order
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LogoProvider>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn LogoProvider>>) -> Self {
        Self { providers }
    }

    /// Build HTTP providers for every enabled entry, keeping config order
    pub fn from_config(
        providers: &[ProviderConfig],
        orchestrator: &OrchestratorConfig,
        client: Client,
    ) -> AppResult<Self> {
        let mut registered: Vec<Arc<dyn LogoProvider>> = Vec::new();
        for config in providers.iter().filter(|p| p.enabled) {
            if registered.iter().any(|p| p.name() == config.kind.name()) {
                return Err(AppError::configuration(format!(
                    "provider '{}' is configured more than once",
                    config.kind
                )));
            }
            registered.push(Arc::new(HttpLogoProvider::from_config(
                config,
                client.clone(),
                orchestrator.attempt_timeout,
            )));
        }

        if registered.is_empty() {
            return Err(AppError::configuration("no logo providers are enabled"));
        }

        info!(
            "Registered {} logo providers: {}",
            registered.len(),
            registered
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self::new(registered))
    }

    pub fn providers(&self) -> &[Arc<dyn LogoProvider>] {
        &self.providers
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
