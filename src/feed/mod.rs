//! URL sources and snapshot sinks
//!
//! The engine consumes two narrow interfaces: something that lists pending
//! product URLs per marketplace, and something that accepts batches of
//! snapshots. Both are implemented twice — against the remote table API and
//! against a local SQLite database — and selected by configuration.

mod api;
mod store;

pub use api::TableApi;
pub use store::SqliteStore;

use crate::config::{Config, FeedKind};
use crate::marketplace::Marketplace;
use crate::model::{PendingProduct, ProductSnapshot};
use crate::WatchError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from URL sources and snapshot sinks
///
/// These are transport-level problems; the engine logs them at the batch or
/// marketplace level and keeps going.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Lists the product URLs pending a refresh for one marketplace
///
/// An empty list is a normal answer meaning "nothing to do this cycle".
#[async_trait]
pub trait UrlSource: Send + Sync {
    async fn pending_products(&self, marketplace: Marketplace)
        -> FeedResult<Vec<PendingProduct>>;
}

/// Receives one delivery per processed batch
///
/// Implementations upsert by articul/product URL, so redelivery overwrites
/// instead of duplicating.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn send_batch(
        &self,
        marketplace: Marketplace,
        snapshots: &[ProductSnapshot],
    ) -> FeedResult<()>;
}

/// Builds the configured source/sink pair
///
/// Both roles are served by the same backend instance; the two trait objects
/// share it.
pub fn build(config: &Config) -> Result<(Arc<dyn UrlSource>, Arc<dyn SnapshotSink>), WatchError> {
    match config.feed.kind {
        FeedKind::Api => {
            let base_url = config.feed.base_url.as_deref().unwrap_or_default();
            let api = Arc::new(TableApi::new(base_url)?);
            Ok((api.clone(), api))
        }
        FeedKind::Sqlite => {
            let path = config.feed.database_path.as_deref().unwrap_or_default();
            let store = Arc::new(SqliteStore::open(Path::new(path)).map_err(WatchError::Feed)?);
            Ok((store.clone(), store))
        }
    }
}
