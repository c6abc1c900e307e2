//! Domains a company-name search must never resolve to
//!
//! Search results for a company are full of pages *about* the company. Those
//! hosts (the search engine itself, encyclopedias, social networks, news and
//! data aggregators, government sites) would produce the wrong logo.

use crate::utils::url::UrlUtils;

/// Matched against the host and all of its parent domains
pub const DISALLOWED_SUFFIXES: &[&str] = &[
    "wikipedia.org",
    "wikidata.org",
    "wikimedia.org",
    "britannica.com",
    "duckduckgo.com",
    "google.com",
    "bing.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "instagram.com",
    "youtube.com",
    "tiktok.com",
    "reddit.com",
    "crunchbase.com",
    "bloomberg.com",
];

/// Government and military hosts: `.gov`, `.mil` and `.gov.xx`
pub fn is_government(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    match labels.as_slice() {
        [.., "gov"] | [.., "mil"] => true,
        [.., "gov", country] => country.len() == 2,
        _ => false,
    }
}

pub fn is_disallowed(domain: &str) -> bool {
    DISALLOWED_SUFFIXES.iter().any(|suffix| {
        domain == *suffix
            || domain
                .strip_suffix(suffix)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }) || is_government(domain)
}

/// Normalize a raw search result (URL or bare host) into an acceptable domain
pub fn accept_candidate(raw: &str) -> Option<String> {
    let domain = UrlUtils::normalize_domain(raw)?;
    (!is_disallowed(&domain)).then_some(domain)
}
