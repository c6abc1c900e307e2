//! Company-name search strategies

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::StrategyConfig;
use crate::errors::ProviderError;
use crate::utils::url::UrlUtils;

static RESULT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a\b[^>]*\bclass="result__a"[^>]*>"#).expect("valid result link regex")
});

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bhref="([^"]+)""#).expect("valid href regex"));

/// One way of turning a company name into candidate domains
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Raw candidates (URLs or hosts) in preference order, unfiltered
    async fn candidates(&self, company_name: &str) -> Result<Vec<String>, ProviderError>;
}

/// The known strategies, in default order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    ClearbitAutocomplete,
    DuckduckgoHtml,
    DotcomGuess,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        Self::ClearbitAutocomplete,
        Self::DuckduckgoHtml,
        Self::DotcomGuess,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ClearbitAutocomplete => "clearbit-autocomplete",
            Self::DuckduckgoHtml => "duckduckgo-html",
            Self::DotcomGuess => "dotcom-guess",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::ClearbitAutocomplete => "https://autocomplete.clearbit.com/v1/companies/suggest",
            Self::DuckduckgoHtml => "https://html.duckduckgo.com/html/",
            Self::DotcomGuess => "https://{domain}",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Deserialize)]
struct CompanySuggestion {
    #[serde(default)]
    domain: Option<String>,
}

/// A strategy backed by one HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpSearchStrategy {
    kind: StrategyKind,
    base_url: String,
    client: Client,
    request_timeout: Duration,
}

impl HttpSearchStrategy {
    pub fn new(kind: StrategyKind, client: Client, request_timeout: Duration) -> Self {
        Self {
            kind,
            base_url: kind.default_base_url().to_string(),
            client,
            request_timeout,
        }
    }

    pub fn from_config(config: &StrategyConfig, client: Client, request_timeout: Duration) -> Self {
        let mut strategy = Self::new(config.kind, client, request_timeout);
        if let Some(base_url) = &config.base_url {
            strategy.base_url = base_url.clone();
        }
        strategy
    }

    async fn clearbit_autocomplete(&self, company_name: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("query", company_name)])
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                status: response.status().as_u16(),
            });
        }
        let suggestions: Vec<CompanySuggestion> = response.json().await.map_err(network_error)?;
        Ok(suggestions.into_iter().filter_map(|s| s.domain).collect())
    }

    async fn duckduckgo_html(&self, company_name: &str) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", company_name)])
            .send()
            .await
            .map_err(network_error)?;
        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                status: response.status().as_u16(),
            });
        }
        let html = response.text().await.map_err(network_error)?;
        Ok(extract_result_links(&html))
    }

    async fn dotcom_guess(&self, company_name: &str) -> Result<Vec<String>, ProviderError> {
        let compact: String = UrlUtils::slugify(company_name)
            .chars()
            .filter(|c| *c != '-')
            .collect();
        if compact.is_empty() {
            return Ok(Vec::new());
        }
        let guess = format!("{compact}.com");
        let url = self.base_url.replace("{domain}", &guess);

        let response = self.client.head(&url).send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(vec![guess])
    }
}

#[async_trait]
impl SearchStrategy for HttpSearchStrategy {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn candidates(&self, company_name: &str) -> Result<Vec<String>, ProviderError> {
        let search = async {
            match self.kind {
                StrategyKind::ClearbitAutocomplete => self.clearbit_autocomplete(company_name).await,
                StrategyKind::DuckduckgoHtml => self.duckduckgo_html(company_name).await,
                StrategyKind::DotcomGuess => self.dotcom_guess(company_name).await,
            }
        };
        timeout(self.request_timeout, search)
            .await
            .unwrap_or(Err(ProviderError::Timeout {
                millis: self.request_timeout.as_millis() as u64,
            }))
    }
}

fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Network(e.without_url().to_string())
}

/// Result link targets from a DuckDuckGo HTML results page
///
/// Links are usually wrapped in a `/l/?uddg=<encoded target>` redirect; the
/// target is unwrapped when present.
pub fn extract_result_links(html: &str) -> Vec<String> {
    RESULT_LINK
        .find_iter(html)
        .filter_map(|tag| HREF.captures(tag.as_str()))
        .filter_map(|caps| caps.get(1))
        .map(|href| unwrap_redirect(&href.as_str().replace("&amp;", "&")))
        .collect()
}

fn unwrap_redirect(href: &str) -> String {
    let target = href
        .split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("uddg="))
        .and_then(|encoded| urlencoding::decode(encoded).ok())
        .map(|decoded| decoded.into_owned());

    match target {
        Some(target) => target,
        None if href.starts_with("//") => format!("https:{href}"),
        None => href.to_string(),
    }
}
