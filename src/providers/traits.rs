use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::config::defaults::DEFAULT_LOGO_SIZE;
use crate::errors::ProviderError;
use crate::models::{CandidateResult, LogoRequest};

/// Capability shared by every logo source
#[async_trait]
pub trait LogoProvider: Send + Sync {
    /// Stable provider name, used for ranking and logs
    fn name(&self) -> &str;

    /// Make one attempt for `request`
    ///
    /// Never fails: every outcome, including timeouts and unusable responses,
    /// is reported on the returned candidate.
    async fn attempt(&self, request: &LogoRequest) -> CandidateResult;
}

/// The known provider set, in default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "logo-dev")]
    LogoDev,
    #[serde(rename = "clearbit")]
    Clearbit,
    #[serde(rename = "duckduckgo")]
    DuckDuckGo,
    #[serde(rename = "google-favicon")]
    GoogleFavicon,
    #[serde(rename = "favicon")]
    DirectFavicon,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        Self::LogoDev,
        Self::Clearbit,
        Self::DuckDuckGo,
        Self::GoogleFavicon,
        Self::DirectFavicon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LogoDev => "logo.dev",
            Self::Clearbit => "clearbit",
            Self::DuckDuckGo => "duckduckgo",
            Self::GoogleFavicon => "google-favicon",
            Self::DirectFavicon => "favicon",
        }
    }

    /// Base URL used when configuration does not override it
    ///
    /// `{domain}` in a base is replaced by the request's domain.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::LogoDev => "https://img.logo.dev",
            Self::Clearbit => "https://logo.clearbit.com",
            Self::DuckDuckGo => "https://icons.duckduckgo.com/ip3",
            Self::GoogleFavicon => "https://www.google.com/s2/favicons",
            Self::DirectFavicon => "https://{domain}",
        }
    }

    /// Only logo.dev can look a logo up by company name
    pub fn requires_domain(&self) -> bool {
        !matches!(self, Self::LogoDev)
    }

    /// Build the request URL for `request` against `base_url`
    pub fn build_url(
        &self,
        base_url: &str,
        request: &LogoRequest,
        token: Option<&str>,
    ) -> Result<String, ProviderError> {
        let domain = request.domain.as_deref();
        if self.requires_domain() && domain.is_none() {
            return Err(ProviderError::DomainRequired);
        }

        let base = base_url
            .replace("{domain}", domain.unwrap_or_default())
            .trim_end_matches('/')
            .to_string();
        let size = request.size.map(|s| s.to_string());

        let url = match self {
            Self::LogoDev => {
                let path = match (domain, request.company_name.as_deref()) {
                    (Some(domain), _) => format!("{base}/{domain}"),
                    (None, Some(name)) => format!("{base}/name/{}", urlencoding::encode(name)),
                    (None, None) => return Err(ProviderError::DomainRequired),
                };
                let mut params: Vec<(&str, &str)> = vec![("format", request.format.as_str())];
                if let Some(size) = size.as_deref() {
                    params.push(("size", size));
                }
                if request.greyscale {
                    params.push(("greyscale", "true"));
                }
                if let Some(token) = token {
                    params.push(("token", token));
                }
                parse_with_params(&path, &params)?
            }
            Self::Clearbit => {
                let path = format!("{base}/{}", domain.unwrap_or_default());
                let mut params: Vec<(&str, &str)> = Vec::new();
                if let Some(size) = size.as_deref() {
                    params.push(("size", size));
                }
                if request.greyscale {
                    params.push(("greyscale", "true"));
                }
                parse_with_params(&path, &params)?
            }
            Self::DuckDuckGo => format!("{base}/{}.ico", domain.unwrap_or_default()),
            Self::GoogleFavicon => {
                let size = request.size.unwrap_or(DEFAULT_LOGO_SIZE).to_string();
                parse_with_params(
                    &base,
                    &[("domain", domain.unwrap_or_default()), ("sz", size.as_str())],
                )?
            }
            Self::DirectFavicon => format!("{base}/favicon.ico"),
        };
        Ok(url)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_with_params(base: &str, params: &[(&str, &str)]) -> Result<String, ProviderError> {
    let url = if params.is_empty() {
        Url::parse(base)
    } else {
        Url::parse_with_params(base, params)
    };
    url.map(String::from)
        .map_err(|e| ProviderError::Network(format!("invalid provider URL '{base}': {e}")))
}
