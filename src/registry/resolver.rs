//! Package metadata resolution
//!
//! Ties the pieces together for one request: obtain the connection for the
//! source, fetch the candidate list, select the version, then fetch owners
//! only when a version actually resolved.

use tracing::debug;

use crate::registry::connection::ConnectionCache;
use crate::registry::error::RegistryError;
use crate::registry::feed::FeedProvider;
use crate::registry::nuget::NuGetProvider;
use crate::registry::select::{parse_version, select_version};
use crate::registry::source::RegistrySource;
use crate::registry::types::ResolvedPackageMetadata;

/// Resolves package metadata against registry sources, reusing one
/// connection per source across calls.
///
/// Cancellation is dropping the returned future: any in-flight registry
/// request aborts and the connection cache is left clean.
pub struct PackageMetadataResolver<P> {
    connections: ConnectionCache<P>,
    default_source: RegistrySource,
}

impl Default for PackageMetadataResolver<NuGetProvider> {
    /// A resolver against NuGet V3 feeds, defaulting to nuget.org.
    fn default() -> Self {
        Self::new(NuGetProvider::new())
    }
}

impl<P: FeedProvider> PackageMetadataResolver<P> {
    pub fn new(provider: P) -> Self {
        Self {
            connections: ConnectionCache::new(provider),
            default_source: RegistrySource::nuget_org(),
        }
    }

    /// Resolve the best-matching published version of a package.
    ///
    /// With a requested version, only that exact version matches; without
    /// one, the absolute-latest policy applies (see
    /// [`select_version`](crate::registry::select::select_version)).
    ///
    /// # Returns
    /// * `Ok(Some(metadata))` - a version matched
    /// * `Ok(None)` - no such package or no matching version; not an error
    /// * `Err(RegistryError)` - the request was malformed or a registry
    ///   operation failed
    pub async fn resolve(
        &self,
        identifier: &str,
        requested_version: Option<&str>,
        source: Option<&RegistrySource>,
    ) -> Result<Option<ResolvedPackageMetadata>, RegistryError> {
        // Reject a malformed request before touching the network.
        let requested = requested_version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| parse_version(v).ok_or_else(|| RegistryError::InvalidVersion(v.to_string())))
            .transpose()?;

        let source = source.unwrap_or(&self.default_source);
        let feed = self.connections.get(source).await?;

        let candidates = feed.fetch_candidates(identifier, true, false).await?;
        debug!(
            "Selecting from {} candidates for {} (requested: {:?})",
            candidates.len(),
            identifier,
            requested
        );

        let Some(candidate) = select_version(&candidates, requested.as_ref()) else {
            debug!("No matching version of {} on {}", identifier, source);
            return Ok(None);
        };
        // Selected candidates always carry a parseable version.
        let version = parse_version(&candidate.version)
            .ok_or_else(|| RegistryError::InvalidVersion(candidate.version.clone()))?;

        // Ownership is identifier-scoped, so this is skipped entirely when
        // no version resolves.
        let owners = feed.fetch_owners(identifier).await?;

        Ok(Some(ResolvedPackageMetadata::new(
            candidate,
            version,
            owners,
            source.clone(),
        )))
    }
}
