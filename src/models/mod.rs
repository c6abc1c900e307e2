//! Domain models for logo resolution
//!
//! [`LogoMetadata`] is the only persisted record; [`CandidateResult`] lives for
//! the duration of a single resolution request.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::defaults::{MAX_LOGO_SIZE, MIN_LOGO_SIZE};
use crate::errors::{AppError, AppResult};
use crate::utils::url::UrlUtils;

/// Image formats the resolver can recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogoFormat {
    Svg,
    #[default]
    Png,
    Jpeg,
    Webp,
    Gif,
    Ico,
    Unknown,
}

impl LogoFormat {
    /// Canonical short name, also used in cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Ico => "ico",
            Self::Unknown => "bin",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Gif => "image/gif",
            Self::Ico => "image/x-icon",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Ranking weight: vector < common raster < icons < unknown (lower wins)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Svg => 0,
            Self::Png | Self::Webp => 1,
            Self::Jpeg | Self::Gif => 2,
            Self::Ico => 3,
            Self::Unknown => 4,
        }
    }

    /// Map a `Content-Type` header value, ignoring parameters such as charset
    pub fn from_content_type(content_type: &str) -> Self {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/svg+xml" | "image/svg" => Self::Svg,
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Self::Jpeg,
            "image/webp" => Self::Webp,
            "image/gif" => Self::Gif,
            "image/x-icon" | "image/vnd.microsoft.icon" | "image/ico" => Self::Ico,
            _ => Self::Unknown,
        }
    }

    /// Infer from the file extension of a URL path
    pub fn from_url(source_url: &str) -> Self {
        let path = url::Url::parse(source_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| source_url.to_string());
        let extension = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "svg" => Self::Svg,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::Webp,
            "gif" => Self::Gif,
            "ico" => Self::Ico,
            _ => Self::Unknown,
        }
    }

    /// Sniff the format from magic bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if let Some(kind) = infer::get(bytes) {
            let format = Self::from_content_type(kind.mime_type());
            if format != Self::Unknown {
                return format;
            }
        }
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).to_ascii_lowercase();
        if head.contains("<svg") {
            Self::Svg
        } else {
            Self::Unknown
        }
    }

    /// Infer a candidate's format, trusting the content type over the URL
    pub fn infer(content_type: Option<&str>, source_url: Option<&str>) -> Self {
        let from_header = content_type.map(Self::from_content_type);
        match from_header {
            Some(format) if format != Self::Unknown => format,
            _ => source_url.map(Self::from_url).unwrap_or(Self::Unknown),
        }
    }
}

impl fmt::Display for LogoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogoFormat {
    type Err = AppError;

    /// Parse a *requested* format; only formats a caller may ask for are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            "svg" => Ok(Self::Svg),
            other => Err(AppError::validation(format!("unsupported format '{other}'"))),
        }
    }
}

/// What a logo record is keyed by: a domain or a company name, never both
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoIdentity {
    Domain(String),
    Company(String),
}

impl LogoIdentity {
    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::Domain(domain) => Some(domain),
            Self::Company(_) => None,
        }
    }

    /// Human-readable value for logs
    pub fn value(&self) -> &str {
        match self {
            Self::Domain(v) | Self::Company(v) => v,
        }
    }
}

/// A caller's resolution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoRequest {
    pub domain: Option<String>,
    pub company_name: Option<String>,
    pub format: LogoFormat,
    pub size: Option<u32>,
    pub greyscale: bool,
    pub use_cache: bool,
}

impl LogoRequest {
    pub fn for_domain<S: Into<String>>(domain: S) -> Self {
        Self {
            domain: Some(domain.into()),
            company_name: None,
            format: LogoFormat::default(),
            size: None,
            greyscale: false,
            use_cache: true,
        }
    }

    pub fn for_company<S: Into<String>>(name: S) -> Self {
        Self {
            domain: None,
            company_name: Some(name.into()),
            ..Self::for_domain("")
        }
    }

    pub fn with_format(mut self, format: LogoFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_greyscale(mut self, greyscale: bool) -> Self {
        self.greyscale = greyscale;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Validate and normalize in place
    ///
    /// The domain is normalized (scheme, `www.` and path removed); a blank
    /// company name is dropped. At least one identity must remain.
    pub fn normalized(mut self) -> AppResult<Self> {
        self.domain = match self.domain.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                UrlUtils::normalize_domain(raw)
                    .ok_or_else(|| AppError::validation(format!("invalid domain '{raw}'")))?,
            ),
        };
        self.company_name = self
            .company_name
            .map(|name| name.trim().to_string())
            .filter(|name| !UrlUtils::slugify(name).is_empty());

        if self.domain.is_none() && self.company_name.is_none() {
            return Err(AppError::validation(
                "either a domain or a company name is required",
            ));
        }
        if let Some(size) = self.size
            && !(MIN_LOGO_SIZE..=MAX_LOGO_SIZE).contains(&size)
        {
            return Err(AppError::validation(format!(
                "size must be between {MIN_LOGO_SIZE} and {MAX_LOGO_SIZE}"
            )));
        }
        Ok(self)
    }

    /// The identity this request is cached under; a domain wins over a name
    pub fn identity(&self) -> Option<LogoIdentity> {
        match (&self.domain, &self.company_name) {
            (Some(domain), _) => Some(LogoIdentity::Domain(domain.clone())),
            (None, Some(name)) => Some(LogoIdentity::Company(name.clone())),
            (None, None) => None,
        }
    }

    /// A name-only request, eligible for the domain resolution fallback
    pub fn is_name_only(&self) -> bool {
        self.domain.is_none() && self.company_name.is_some()
    }

    /// Same request with a resolved domain substituted
    pub fn with_resolved_domain(&self, domain: &str) -> Self {
        Self {
            domain: Some(domain.to_string()),
            company_name: None,
            ..self.clone()
        }
    }
}

/// One resolved and persisted logo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoMetadata {
    pub identity: LogoIdentity,
    pub provider: String,
    pub format: LogoFormat,
    pub size: Option<u32>,
    #[serde(default)]
    pub greyscale: bool,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub retrieved_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub byte_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl LogoMetadata {
    /// Build the record for a ranked winner
    pub fn from_candidate(request: &LogoRequest, candidate: &CandidateResult) -> Option<Self> {
        let identity = request.identity()?;
        let source_url = candidate.source_url.clone()?;
        let (width, height) = candidate
            .bytes
            .as_deref()
            .and_then(image_dimensions)
            .map_or((None, None), |(w, h)| (Some(w), Some(h)));

        Some(Self {
            identity,
            provider: candidate.provider.clone(),
            format: candidate.format(),
            size: request.size,
            greyscale: request.greyscale,
            source_url,
            content_type: candidate.content_type.clone(),
            retrieved_at: Utc::now(),
            latency_ms: candidate.elapsed.as_millis() as u64,
            byte_size: candidate.byte_len,
            width,
            height,
        })
    }

    /// Age at `now`, clamped to zero for clock skew
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.retrieved_at).max(chrono::Duration::zero())
    }

    pub fn mime_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or_else(|| self.format.mime_type().to_string())
    }
}

fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Outcome of one provider attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub success: bool,
    pub provider: String,
    pub source_url: Option<String>,
    pub error: Option<String>,
    /// Present only when the byte fetch after verification succeeded
    pub bytes: Option<Bytes>,
    pub byte_len: u64,
    pub elapsed: Duration,
    pub content_type: Option<String>,
}

impl CandidateResult {
    pub fn success(
        provider: &str,
        source_url: String,
        content_type: Option<String>,
        bytes: Option<Bytes>,
        elapsed: Duration,
    ) -> Self {
        let byte_len = bytes.as_ref().map_or(0, |b| b.len() as u64);
        Self {
            success: true,
            provider: provider.to_string(),
            source_url: Some(source_url),
            error: None,
            bytes,
            byte_len,
            elapsed,
            content_type,
        }
    }

    pub fn failure<E: ToString>(
        provider: &str,
        source_url: Option<String>,
        error: E,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: false,
            provider: provider.to_string(),
            source_url,
            error: Some(error.to_string()),
            bytes: None,
            byte_len: 0,
            elapsed,
            content_type: None,
        }
    }

    /// Format inferred from what the provider actually served
    pub fn format(&self) -> LogoFormat {
        if let Some(bytes) = &self.bytes {
            let sniffed = LogoFormat::from_bytes(bytes);
            if sniffed != LogoFormat::Unknown {
                return sniffed;
            }
        }
        LogoFormat::infer(self.content_type.as_deref(), self.source_url.as_deref())
    }
}

/// Result handed to the HTTP boundary
#[derive(Debug, Clone, Default)]
pub struct LogoResponse {
    pub success: bool,
    pub logo_bytes: Option<Bytes>,
    pub logo_url: Option<String>,
    pub metadata: Option<LogoMetadata>,
    pub from_cache: bool,
    pub error: Option<String>,
}

impl LogoResponse {
    pub fn cached(bytes: Bytes, metadata: LogoMetadata) -> Self {
        Self {
            success: true,
            logo_url: Some(metadata.source_url.clone()),
            logo_bytes: Some(bytes),
            metadata: Some(metadata),
            from_cache: true,
            error: None,
        }
    }

    pub fn fetched(bytes: Option<Bytes>, metadata: LogoMetadata) -> Self {
        Self {
            success: true,
            logo_url: Some(metadata.source_url.clone()),
            logo_bytes: bytes,
            metadata: Some(metadata),
            from_cache: false,
            error: None,
        }
    }

    pub fn not_found<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Rate limiter verdict for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}
