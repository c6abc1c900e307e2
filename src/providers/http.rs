//! HTTP-backed provider implementation shared by every [`ProviderKind`]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, header::CONTENT_TYPE};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

use crate::config::{OrchestratorConfig, ProviderConfig};
use crate::errors::{AppResult, ProviderError};
use crate::models::{CandidateResult, LogoFormat, LogoRequest};
use crate::observability::{AttemptAction, record_attempt};
use crate::utils::url::UrlUtils;

use super::traits::{LogoProvider, ProviderKind};

/// Build the client shared by every provider and resolver strategy
///
/// Only the connect phase is bounded here; each attempt applies its own
/// deadline so one slow provider cannot hold the whole chain.
pub fn build_http_client(config: &OrchestratorConfig) -> AppResult<Client> {
    let client = Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

/// A provider reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpLogoProvider {
    kind: ProviderKind,
    base_url: String,
    token: Option<String>,
    client: Client,
    attempt_timeout: Duration,
}

/// What a verified response turned out to be
enum Verified {
    /// Image content type; body not read yet
    Image {
        response: Response,
        content_type: String,
    },
    /// Content type was missing or generic; body already read and sniffed
    Sniffed { bytes: Bytes, content_type: String },
}

impl HttpLogoProvider {
    pub fn new(kind: ProviderKind, client: Client, attempt_timeout: Duration) -> Self {
        Self {
            kind,
            base_url: kind.default_base_url().to_string(),
            token: None,
            client,
            attempt_timeout,
        }
    }

    pub fn from_config(config: &ProviderConfig, client: Client, attempt_timeout: Duration) -> Self {
        let mut provider = Self::new(config.kind, client, attempt_timeout);
        if let Some(base_url) = &config.base_url {
            provider.base_url = base_url.clone();
        }
        provider.token = config.token.clone();
        provider
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn timeout_error(&self) -> ProviderError {
        ProviderError::Timeout {
            millis: self.attempt_timeout.as_millis() as u64,
        }
    }

    async fn verify(&self, url: &str) -> Result<Verified, ProviderError> {
        let response = match timeout(self.attempt_timeout, self.client.get(url).send()).await {
            Err(_) => return Err(self.timeout_error()),
            Ok(Err(e)) => return Err(ProviderError::Network(e.without_url().to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            self.drain(response).await;
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        match content_type {
            Some(ct) if ct.starts_with("image/") => Ok(Verified::Image {
                response,
                content_type: ct,
            }),
            None => self.sniff(response, "unknown").await,
            Some(ct) if ct.contains("octet-stream") => self.sniff(response, &ct).await,
            Some(ct) => {
                self.drain(response).await;
                Err(ProviderError::NotAnImage { content_type: ct })
            }
        }
    }

    /// Read a generically typed body and accept it only if it sniffs as an image
    async fn sniff(&self, response: Response, declared: &str) -> Result<Verified, ProviderError> {
        let bytes = self.read_body(response).await?;
        match LogoFormat::from_bytes(&bytes) {
            LogoFormat::Unknown => Err(ProviderError::NotAnImage {
                content_type: declared.to_string(),
            }),
            format => Ok(Verified::Sniffed {
                bytes,
                content_type: format.mime_type().to_string(),
            }),
        }
    }

    async fn read_body(&self, response: Response) -> Result<Bytes, ProviderError> {
        match timeout(self.attempt_timeout, response.bytes()).await {
            Err(_) => Err(self.timeout_error()),
            Ok(Err(e)) => Err(ProviderError::Network(e.without_url().to_string())),
            Ok(Ok(bytes)) if bytes.is_empty() => Err(ProviderError::EmptyBody),
            Ok(Ok(bytes)) => Ok(bytes),
        }
    }

    /// Consume an unwanted body so the connection can be reused
    async fn drain(&self, mut response: Response) {
        let drained = timeout(self.attempt_timeout, async {
            while let Ok(Some(_)) = response.chunk().await {}
        })
        .await;
        if drained.is_err() {
            debug!(provider = self.kind.name(), "Gave up draining response body");
        }
    }
}

#[async_trait]
impl LogoProvider for HttpLogoProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn attempt(&self, request: &LogoRequest) -> CandidateResult {
        let name = self.kind.name();
        let subject = request
            .identity()
            .map(|identity| identity.value().to_string())
            .unwrap_or_default();
        let started = Instant::now();

        let url = match self
            .kind
            .build_url(&self.base_url, request, self.token.as_deref())
        {
            Ok(url) => url,
            Err(e) => {
                let elapsed = started.elapsed();
                record_attempt(name, AttemptAction::Verify, &subject, elapsed, Some(e.to_string().as_str()));
                return CandidateResult::failure(name, None, e, elapsed);
            }
        };
        debug!(
            provider = name,
            url = %UrlUtils::obfuscate_credentials(&url),
            "Attempting provider"
        );
        // stored and redirected to, so it must not carry the provider token
        let public_url = UrlUtils::strip_credentials(&url);

        let verified = self.verify(&url).await;
        let verify_elapsed = started.elapsed();
        let verified = match verified {
            Ok(verified) => {
                record_attempt(name, AttemptAction::Verify, &subject, verify_elapsed, None);
                verified
            }
            Err(e) => {
                record_attempt(name, AttemptAction::Verify, &subject, verify_elapsed, Some(e.to_string().as_str()));
                return CandidateResult::failure(name, Some(public_url), e, verify_elapsed);
            }
        };

        match verified {
            Verified::Sniffed {
                bytes,
                content_type,
            } => CandidateResult::success(name, public_url, Some(content_type), Some(bytes), verify_elapsed),
            Verified::Image {
                response,
                content_type,
            } => {
                let fetch_started = Instant::now();
                match self.read_body(response).await {
                    Ok(bytes) => {
                        record_attempt(name, AttemptAction::FetchBytes, &subject, fetch_started.elapsed(), None);
                        CandidateResult::success(name, public_url, Some(content_type), Some(bytes), verify_elapsed)
                    }
                    Err(ProviderError::EmptyBody) => {
                        let e = ProviderError::EmptyBody;
                        record_attempt(name, AttemptAction::FetchBytes, &subject, fetch_started.elapsed(), Some(e.to_string().as_str()));
                        CandidateResult::failure(name, Some(public_url), e, started.elapsed())
                    }
                    Err(e) => {
                        // Verified but unreadable: still a usable source URL
                        record_attempt(name, AttemptAction::FetchBytes, &subject, fetch_started.elapsed(), Some(e.to_string().as_str()));
                        CandidateResult::success(name, public_url, Some(content_type), None, verify_elapsed)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x10\0\0\0\x10\x08\x06\0\0\0";

    fn provider(kind: ProviderKind, server: &MockServer, attempt_timeout: Duration) -> HttpLogoProvider {
        let config = ProviderConfig::new(kind).with_base_url(server.uri());
        HttpLogoProvider::from_config(&config, Client::new(), attempt_timeout)
    }

    #[tokio::test]
    async fn test_image_response_is_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/example.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(PNG_MAGIC),
            )
            .expect(1)
            .mount(&server)
            .await;

        let p = provider(ProviderKind::Clearbit, &server, Duration::from_secs(2));
        let result = p.attempt(&LogoRequest::for_domain("example.com")).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.provider, "clearbit");
        assert_eq!(result.byte_len, PNG_MAGIC.len() as u64);
        assert_eq!(result.content_type.as_deref(), Some("image/png"));
        assert_eq!(result.format(), LogoFormat::Png);
    }

    #[tokio::test]
    async fn test_http_error_is_soft_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let p = provider(ProviderKind::Clearbit, &server, Duration::from_secs(2));
        let result = p.attempt(&LogoRequest::for_domain("example.com")).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("HTTP 404"));
        assert!(result.bytes.is_none());
    }

    #[tokio::test]
    async fn test_non_image_content_type_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html>parked domain</html>"),
            )
            .mount(&server)
            .await;

        let p = provider(ProviderKind::DirectFavicon, &server, Duration::from_secs(2));
        let result = p.attempt(&LogoRequest::for_domain("example.com")).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("not an image (content-type: text/html; charset=utf-8)")
        );
    }

    #[tokio::test]
    async fn test_octet_stream_is_sniffed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/example.com.ico"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_bytes(PNG_MAGIC),
            )
            .mount(&server)
            .await;

        let p = provider(ProviderKind::DuckDuckGo, &server, Duration::from_secs(2));
        let result = p.attempt(&LogoRequest::for_domain("example.com")).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.content_type.as_deref(), Some("image/png"));
        assert!(result.bytes.is_some());
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(PNG_MAGIC)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let p = provider(ProviderKind::Clearbit, &server, Duration::from_millis(100));
        let result = p.attempt(&LogoRequest::for_domain("example.com")).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("timed out after 100ms"));
    }

    #[tokio::test]
    async fn test_empty_body_is_soft_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
            .mount(&server)
            .await;

        let p = provider(ProviderKind::Clearbit, &server, Duration::from_secs(2));
        let result = p.attempt(&LogoRequest::for_domain("example.com")).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("empty response body"));
    }

    #[tokio::test]
    async fn test_domain_required_sends_no_request() {
        let server = MockServer::start().await;

        let p = provider(ProviderKind::Clearbit, &server, Duration::from_secs(2));
        let result = p.attempt(&LogoRequest::for_company("Acme")).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("requires a domain"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_token_is_sent_but_not_kept_on_the_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/example.com"))
            .and(query_param("token", "pk_secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(PNG_MAGIC),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut config = ProviderConfig::new(ProviderKind::LogoDev).with_base_url(server.uri());
        config.token = Some("pk_secret".to_string());
        let p = HttpLogoProvider::from_config(&config, Client::new(), Duration::from_secs(2));
        let result = p.attempt(&LogoRequest::for_domain("example.com")).await;

        assert!(result.success, "{:?}", result.error);
        let source_url = result.source_url.unwrap();
        assert!(!source_url.contains("token"), "{source_url}");
        assert!(!source_url.contains("pk_secret"), "{source_url}");
        assert!(source_url.ends_with("/example.com?format=png"), "{source_url}");
    }
}
