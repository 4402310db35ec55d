// =============================================================================
// Registry constants
// =============================================================================

/// Service index of the default public registry, used when the caller
/// supplies no source.
pub const NUGET_ORG_INDEX: &str = "https://api.nuget.org/v3/index.json";

/// User agent sent with every registry request.
pub const USER_AGENT: &str = concat!("nupkg-meta/", env!("CARGO_PKG_VERSION"));

/// Number of search results requested when looking up package owners.
/// Ownership is identifier-scoped, so the top-ranked hit is enough.
pub const OWNER_SEARCH_TAKE: usize = 1;
