//! Candidate and resolved package metadata

use semver::Version;

use crate::registry::source::RegistrySource;

/// License attribution for a published version.
///
/// Registries report either an SPDX-style expression or a license URL;
/// at most one of the two is meaningful for a given version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseInfo {
    /// SPDX-style license expression, e.g. "MIT" or "Apache-2.0".
    Expression(String),
    /// Link to the license text.
    Url(String),
}

/// One published version of a package as reported by the registry.
///
/// The version is kept as the raw registry string; selection parses it and
/// skips candidates that do not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMetadata {
    pub identifier: String,
    pub version: String,
    pub authors: String,
    pub description: Option<String>,
    pub license: Option<LicenseInfo>,
    pub project_url: Option<String>,
    pub listed: bool,
}

/// The assembled resolution result: one version's metadata plus the
/// identifier-scoped owners and the source it came from.
///
/// Only ever constructed for a version present in the fetched candidate set;
/// "no match" is represented by the absence of a result, never by a partially
/// filled instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackageMetadata {
    pub identifier: String,
    pub version: Version,
    pub authors: String,
    pub description: Option<String>,
    pub license: Option<LicenseInfo>,
    pub project_url: Option<String>,
    pub owners: String,
    pub source: RegistrySource,
}

impl ResolvedPackageMetadata {
    pub(crate) fn new(
        candidate: &CandidateMetadata,
        version: Version,
        owners: String,
        source: RegistrySource,
    ) -> Self {
        Self {
            identifier: candidate.identifier.clone(),
            version,
            authors: candidate.authors.clone(),
            description: candidate.description.clone(),
            license: candidate.license.clone(),
            project_url: candidate.project_url.clone(),
            owners,
            source,
        }
    }
}
