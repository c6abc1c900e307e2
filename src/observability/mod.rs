//! Structured attempt records
//!
//! Every outbound call the engine makes (provider verification, byte fetches,
//! domain search strategies) is logged through [`record_attempt`] so the
//! records share one field layout and can be filtered on `target`.

use std::time::Duration;
use tracing::{info, warn};

/// Tracing target for attempt records
pub const ATTEMPT_TARGET: &str = "logo_resolver::attempts";

/// What an attempt was trying to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptAction {
    /// Provider request checking that a logo exists and is an image
    Verify,
    /// Reading the logo body after a successful verification
    FetchBytes,
    /// One domain search strategy for a company name
    ResolveDomain,
}

impl AttemptAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::FetchBytes => "fetch_bytes",
            Self::ResolveDomain => "resolve_domain",
        }
    }
}

/// Log one attempt; `error` is `None` for successes
pub fn record_attempt(
    source: &str,
    action: AttemptAction,
    subject: &str,
    duration: Duration,
    error: Option<&str>,
) {
    let duration_ms = duration.as_millis() as u64;
    match error {
        None => info!(
            target: ATTEMPT_TARGET,
            provider = source,
            action = action.as_str(),
            subject,
            duration_ms,
            "attempt succeeded"
        ),
        Some(error) => warn!(
            target: ATTEMPT_TARGET,
            provider = source,
            action = action.as_str(),
            subject,
            duration_ms,
            error,
            "attempt failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(AttemptAction::Verify.as_str(), "verify");
        assert_eq!(AttemptAction::FetchBytes.as_str(), "fetch_bytes");
        assert_eq!(AttemptAction::ResolveDomain.as_str(), "resolve_domain");
    }

    #[test]
    fn test_recording_without_subscriber_is_harmless() {
        record_attempt("clearbit", AttemptAction::Verify, "example.com", Duration::from_millis(12), None);
        record_attempt(
            "clearbit",
            AttemptAction::Verify,
            "example.com",
            Duration::from_millis(12),
            Some("HTTP 404"),
        );
    }
}
