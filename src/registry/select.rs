//! Version selection policy
//!
//! Pure, synchronous selection over a fetched candidate list. Two branches
//! that never mix: an exact match when the caller requested a version, and an
//! "absolute latest" scan when it did not.

use semver::Version;

use crate::registry::types::CandidateMetadata;

/// Parse a version string into a semver::Version, normalizing partial
/// versions by padding with zeros ("1" -> 1.0.0, "1.2" -> 1.2.0).
///
/// Anything else that does not parse as semver (including four-part legacy
/// versions) yields None.
pub fn parse_version(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Select the single best-matching candidate, or None.
///
/// With a requested version, the first candidate whose parsed version equals
/// it exactly wins; the floating scan is never consulted. Without one, a
/// single pass keeps a running best: a candidate replaces the best only when
/// strictly greater (ties keep the earlier-seen candidate), unparseable
/// versions are never selected, and stable versions are preferred over
/// prereleases. A prerelease can win only when no candidate is stable.
pub fn select_version<'a>(
    candidates: &'a [CandidateMetadata],
    requested: Option<&Version>,
) -> Option<&'a CandidateMetadata> {
    if let Some(requested) = requested {
        return candidates
            .iter()
            .find(|c| parse_version(&c.version).is_some_and(|v| v == *requested));
    }

    let mut best_stable: Option<(&CandidateMetadata, Version)> = None;
    let mut best_prerelease: Option<(&CandidateMetadata, Version)> = None;

    for candidate in candidates {
        let Some(version) = parse_version(&candidate.version) else {
            continue;
        };
        let slot = if version.pre.is_empty() {
            &mut best_stable
        } else {
            &mut best_prerelease
        };
        match slot {
            Some((_, best)) if version <= *best => {}
            _ => *slot = Some((candidate, version)),
        }
    }

    best_stable.or(best_prerelease).map(|(candidate, _)| candidate)
}
