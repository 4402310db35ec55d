//! Per-source connection cache
//!
//! Opening a feed costs a service-index round-trip, so connections are
//! created once per source and reused for the lifetime of the cache. Query
//! results are never cached here; only the connections are.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::registry::error::RegistryError;
use crate::registry::feed::{FeedProvider, MetadataFeed};
use crate::registry::source::RegistrySource;

type FeedCell = Arc<OnceCell<Arc<dyn MetadataFeed>>>;

/// Keyed connection pool with create-once-per-key semantics.
///
/// Each source gets its own init cell, so concurrent requests for the same
/// unseen source open exactly one connection while unrelated sources never
/// wait on each other's creation. A failed creation leaves the cell empty:
/// the next request for that source retries instead of observing a cached
/// failure. The same holds when a caller is cancelled mid-creation.
pub struct ConnectionCache<P> {
    provider: P,
    feeds: Mutex<HashMap<RegistrySource, FeedCell>>,
}

impl<P: FeedProvider> ConnectionCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            feeds: Mutex::new(HashMap::new()),
        }
    }

    /// Get the connection for a source, opening it on first use.
    pub async fn get(
        &self,
        source: &RegistrySource,
    ) -> Result<Arc<dyn MetadataFeed>, RegistryError> {
        let cell = {
            let mut feeds = self
                .feeds
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            feeds.entry(source.clone()).or_default().clone()
        };

        let feed = cell
            .get_or_try_init(|| async {
                debug!("Opening connection to {}", source);
                self.provider.connect(source).await
            })
            .await?;

        Ok(Arc::clone(feed))
    }
}
