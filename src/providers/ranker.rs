//! Deterministic selection of one candidate among provider successes
//!
//! Candidates are ordered by a lexicographic key, best first:
//!
//! 1. provider tier (brand databases above favicon scraping)
//! 2. format priority (vector, then common raster, then ICO, then unknown)
//! 3. fetched byte size, larger first, but only within a (tier, format) group
//!    where every candidate carries bytes
//! 4. latency, lower first
//! 5. provider name, then source URL
//!
//! Whether size applies is decided per group over the whole candidate set, so
//! the key stays a total order and the winner does not depend on the order the
//! candidates arrived in.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Duration;

use crate::models::CandidateResult;

/// Tier for providers missing from [`PROVIDER_TIERS`]
pub const DEFAULT_TIER: u8 = 30;

/// Provider name to tier, lower is better
pub const PROVIDER_TIERS: &[(&str, u8)] = &[
    ("logo.dev", 10),
    ("clearbit", 20),
    ("duckduckgo", 40),
    ("google-favicon", 50),
    ("favicon", 60),
];

type RankKey<'a> = (u8, u8, Reverse<u64>, Duration, &'a str, &'a str);

pub struct ResultRanker;

impl ResultRanker {
    pub fn tier(provider: &str) -> u8 {
        PROVIDER_TIERS
            .iter()
            .find(|(name, _)| *name == provider)
            .map_or(DEFAULT_TIER, |(_, tier)| *tier)
    }

    fn group(candidate: &CandidateResult) -> (u8, u8) {
        (Self::tier(&candidate.provider), candidate.format().priority())
    }

    /// (tier, format) groups in which at least one candidate has no bytes
    fn groups_missing_bytes<'a>(
        candidates: impl IntoIterator<Item = &'a CandidateResult>,
    ) -> HashSet<(u8, u8)> {
        candidates
            .into_iter()
            .filter(|c| c.bytes.is_none())
            .map(Self::group)
            .collect()
    }

    fn key<'a>(candidate: &'a CandidateResult, unsized_groups: &HashSet<(u8, u8)>) -> RankKey<'a> {
        let (tier, format) = Self::group(candidate);
        let size = if unsized_groups.contains(&(tier, format)) {
            0
        } else {
            candidate.byte_len
        };
        (
            tier,
            format,
            Reverse(size),
            candidate.elapsed,
            candidate.provider.as_str(),
            candidate.source_url.as_deref().unwrap_or_default(),
        )
    }

    /// Pick the best successful candidate; failures are ignored
    pub fn select(candidates: &[CandidateResult]) -> Option<&CandidateResult> {
        let unsized_groups = Self::groups_missing_bytes(candidates.iter().filter(|c| c.success));
        candidates
            .iter()
            .filter(|c| c.success)
            .min_by(|a, b| Self::key(a, &unsized_groups).cmp(&Self::key(b, &unsized_groups)))
    }

    /// Successful candidates, best first
    pub fn rank(candidates: &[CandidateResult]) -> Vec<&CandidateResult> {
        let mut ranked: Vec<_> = candidates.iter().filter(|c| c.success).collect();
        let unsized_groups = Self::groups_missing_bytes(ranked.iter().copied());
        ranked.sort_by(|a, b| Self::key(a, &unsized_groups).cmp(&Self::key(b, &unsized_groups)));
        ranked
    }
}
