//! Sequential provider failover with a single domain-resolution retry

use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{CandidateResult, LogoRequest};
use crate::resolver::DomainResolver;

use super::factory::ProviderRegistry;

/// Everything one orchestration produced
#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    /// Successful candidates, possibly empty
    pub successes: Vec<CandidateResult>,
    /// Joined provider errors when nothing succeeded
    pub error_summary: Option<String>,
    /// The request the successes belong to (the resolved-domain request after
    /// a fallback)
    pub request: LogoRequest,
    /// Domain found by the resolver, if the fallback ran and succeeded
    pub resolved_domain: Option<String>,
}

impl OrchestrationOutcome {
    pub fn is_empty(&self) -> bool {
        self.successes.is_empty()
    }
}

pub struct ProviderOrchestrator {
    registry: ProviderRegistry,
    resolver: Option<Arc<DomainResolver>>,
    stop_on_first_success: bool,
}

impl ProviderOrchestrator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            resolver: None,
            stop_on_first_success: false,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<DomainResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn stop_on_first_success(mut self, stop: bool) -> Self {
        self.stop_on_first_success = stop;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// One pass over every provider, in order; returns all attempts
    pub async fn run_pass(&self, request: &LogoRequest) -> Vec<CandidateResult> {
        let mut attempts = Vec::with_capacity(self.registry.len());
        for provider in self.registry.providers() {
            let result = provider.attempt(request).await;
            let succeeded = result.success;
            attempts.push(result);
            if succeeded && self.stop_on_first_success {
                break;
            }
        }
        attempts
    }

    /// Try every provider; for a name-only request that found nothing,
    /// resolve a domain once and retry the full list once
    pub async fn orchestrate(&self, request: &LogoRequest) -> OrchestrationOutcome {
        let attempts = self.run_pass(request).await;
        let mut errors = collect_errors(&attempts);
        let successes = successes_of(attempts);

        if !successes.is_empty() || !request.is_name_only() {
            return outcome(successes, errors, request.clone(), None);
        }

        let company = request.company_name.as_deref().unwrap_or_default();
        let Some(resolver) = &self.resolver else {
            return outcome(successes, errors, request.clone(), None);
        };
        let Some(domain) = resolver.resolve(company).await else {
            errors.push(format!("domain resolution: no domain found for '{company}'"));
            return outcome(successes, errors, request.clone(), None);
        };

        info!(company, domain = %domain, "Retrying providers with resolved domain");
        let retry_request = request.with_resolved_domain(&domain);
        let retry_attempts = self.run_pass(&retry_request).await;
        errors.extend(collect_errors(&retry_attempts));
        outcome(successes_of(retry_attempts), errors, retry_request, Some(domain))
    }
}

fn successes_of(attempts: Vec<CandidateResult>) -> Vec<CandidateResult> {
    attempts.into_iter().filter(|a| a.success).collect()
}

fn collect_errors(attempts: &[CandidateResult]) -> Vec<String> {
    attempts
        .iter()
        .filter(|a| !a.success)
        .map(|a| {
            format!(
                "{}: {}",
                a.provider,
                a.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect()
}

fn outcome(
    successes: Vec<CandidateResult>,
    errors: Vec<String>,
    request: LogoRequest,
    resolved_domain: Option<String>,
) -> OrchestrationOutcome {
    let error_summary = if successes.is_empty() {
        let summary = if errors.is_empty() {
            "no providers attempted".to_string()
        } else {
            errors.join("; ")
        };
        debug!(summary = %summary, "All providers failed");
        Some(summary)
    } else {
        None
    };
    OrchestrationOutcome {
        successes,
        error_summary,
        request,
        resolved_domain,
    }
}
