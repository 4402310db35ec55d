//! Registry endpoint identity

use std::fmt;

use url::Url;

use crate::config::NUGET_ORG_INDEX;
use crate::registry::error::RegistryError;

/// Identity of a registry endpoint: the URL of its service index.
///
/// Used as the connection cache key, so equality and hashing go by the
/// parsed URL, not by instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrySource {
    url: Url,
}

impl RegistrySource {
    /// Parse a source URL supplied by the caller.
    ///
    /// A malformed URL is a connection failure, rejected before any I/O.
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let url = Url::parse(input).map_err(|e| RegistryError::Connection {
            url: input.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { url })
    }

    /// The default public registry (nuget.org).
    pub fn nuget_org() -> Self {
        Self {
            url: Url::parse(NUGET_ORG_INDEX).expect("default feed URL is valid"),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}
