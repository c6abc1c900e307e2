//! Cache key derivation

use std::fmt;

use crate::models::{LogoFormat, LogoIdentity, LogoRequest};
use crate::utils::url::UrlUtils;

const METADATA_PREFIX: &str = "meta:";
const SIDECAR_SUFFIX: &str = ".meta.json";

/// Deterministic key for one logical logo request
///
/// Rendered as `{domain|name}/{identity}/{format}[-{size}][-grey]`. The
/// identity is a normalized domain or a company slug, so the key only ever
/// contains `[a-z0-9./-]` and is safe as an object path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(
        identity: &LogoIdentity,
        format: LogoFormat,
        size: Option<u32>,
        greyscale: bool,
    ) -> Self {
        let (kind, id) = match identity {
            LogoIdentity::Domain(domain) => (
                "domain",
                UrlUtils::normalize_domain(domain)
                    .unwrap_or_else(|| domain.trim().to_ascii_lowercase()),
            ),
            LogoIdentity::Company(name) => ("name", UrlUtils::slugify(name)),
        };

        let mut key = format!("{kind}/{id}/{}", format.as_str());
        if let Some(size) = size {
            key.push_str(&format!("-{size}"));
        }
        if greyscale {
            key.push_str("-grey");
        }
        Self(key)
    }

    /// Key for a request, `None` when it carries no identity
    pub fn for_request(request: &LogoRequest) -> Option<Self> {
        request
            .identity()
            .map(|identity| Self::derive(&identity, request.format, request.size, request.greyscale))
    }

    /// Blob key in the durable tier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Metadata key in the fast tier
    pub fn metadata_key(&self) -> String {
        format!("{METADATA_PREFIX}{}", self.0)
    }

    /// Metadata sidecar key in the durable tier
    pub fn sidecar_key(&self) -> String {
        format!("{}{SIDECAR_SUFFIX}", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
