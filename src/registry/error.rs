use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry source could not be reached or its service index is
    /// unusable. Never cached; a fresh call retries the connection.
    #[error("Failed to connect to registry {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Caller-supplied version string that does not parse. Raised before any
    /// network call is made.
    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}
