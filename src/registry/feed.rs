//! Traits for opening and querying a registry feed

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::registry::error::RegistryError;
use crate::registry::source::RegistrySource;
use crate::registry::types::CandidateMetadata;

/// An opened connection to one registry source.
///
/// Obtained from the connection cache and safe to share across concurrent
/// resolution requests. Each call is a fresh network round-trip; query
/// results are never cached, in contrast to the connection itself.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait MetadataFeed: Send + Sync + std::fmt::Debug {
    /// Fetches the metadata of every published version of a package.
    ///
    /// # Returns
    /// * `Ok(candidates)` - may be empty when the registry has nothing to
    ///   offer for this identifier; that is not an error
    /// * `Err(RegistryError)` - if the query fails
    async fn fetch_candidates(
        &self,
        identifier: &str,
        include_prerelease: bool,
        include_unlisted: bool,
    ) -> Result<Vec<CandidateMetadata>, RegistryError>;

    /// Fetches the registry-reported owners of a package identifier.
    ///
    /// Ownership is independent of version; the top-ranked listed,
    /// non-prerelease search hit is used. Returns an empty string when the
    /// search has no hit.
    async fn fetch_owners(&self, identifier: &str) -> Result<String, RegistryError>;
}

/// Opens feeds for registry sources.
///
/// The seam between the connection cache and the transport: production code
/// resolves a NuGet service index here, tests substitute a mock.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    /// Opens a connection to the given source.
    ///
    /// A failure here propagates to the caller and is not cached.
    async fn connect(
        &self,
        source: &RegistrySource,
    ) -> Result<Arc<dyn MetadataFeed>, RegistryError>;
}
