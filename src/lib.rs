//! Pricewatch: a cyclic marketplace product watcher
//!
//! This crate implements a long-running scraping service that periodically
//! fetches product state (price, availability, rating, review count) for
//! configured URL sets across several marketplaces and forwards normalized
//! snapshots to a downstream store.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod feed;
pub mod marketplace;
pub mod model;
pub mod proxy;

use thiserror::Error;

/// Main error type for pricewatch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Feed error: {0}")]
    Feed(#[from] feed::FeedError),

    #[error("Parser pool error: {0}")]
    Pool(#[from] engine::PoolError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are the only fatal errors: the process refuses to start on an
/// invalid configuration but survives everything that happens after the
/// cycle loop begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for pricewatch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use marketplace::Marketplace;
pub use model::{FailureKind, ParseOutcome, PendingProduct, ProductSnapshot};
