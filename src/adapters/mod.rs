//! Site adapters
//!
//! One adapter per marketplace, all behind the [`SiteAdapter`] trait and
//! dispatched through [`AdapterRegistry`]. The orchestration engine depends
//! only on the trait contract: every invocation resolves to a
//! [`ParseOutcome`], never a panic, and extraction ambiguity degrades to an
//! unavailable snapshot or an explicit failure with a diagnostic message.
//!
//! Extraction strategy is each adapter's private concern; the ones here
//! prefer structured data (JSON-LD, embedded state objects) and fall back to
//! DOM selectors.

mod alibaba;
mod extract;
mod kaspi;
mod ozon;
mod wildberries;

pub use alibaba::AlibabaAdapter;
pub use kaspi::KaspiAdapter;
pub use ozon::OzonAdapter;
pub use wildberries::WildberriesAdapter;

use crate::engine::ParserSession;
use crate::marketplace::Marketplace;
use crate::model::{FailureKind, ParseOutcome, PendingProduct};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A marketplace-specific product page parser
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// The marketplace this adapter handles
    fn marketplace(&self) -> Marketplace;

    /// Parses one product page into an outcome
    ///
    /// Must not panic or return early through any channel other than the
    /// outcome value. Callers bound the whole invocation with a timeout.
    async fn parse_product(&self, session: &ParserSession, product: &PendingProduct)
        -> ParseOutcome;
}

/// Maps marketplace keys to adapter implementations
///
/// Replaces string-keyed branching at call sites: the batch processor looks
/// up the adapter once per dispatch and stays marketplace-agnostic.
pub struct AdapterRegistry {
    adapters: HashMap<Marketplace, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    /// Registry with no adapters; used as a base for custom setups
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registry covering every supported marketplace
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.insert(Arc::new(KaspiAdapter));
        registry.insert(Arc::new(WildberriesAdapter));
        registry.insert(Arc::new(OzonAdapter));
        registry.insert(Arc::new(AlibabaAdapter));
        registry
    }

    /// Registers an adapter under its own marketplace key, replacing any
    /// previous entry
    pub fn insert(&mut self, adapter: Arc<dyn SiteAdapter>) {
        self.adapters.insert(adapter.marketplace(), adapter);
    }

    pub fn get(&self, marketplace: Marketplace) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters.get(&marketplace).cloned()
    }
}

/// Result of fetching a product page body
pub(crate) enum PageFetch {
    /// The page body, ready for extraction
    Body(String),

    /// The page no longer exists (HTTP 404/410); the product is treated as
    /// unavailable rather than failed
    Gone,

    /// A failure outcome ready to bubble up
    Failed(ParseOutcome),
}

/// Fetches a product page through the borrowed session
///
/// Classifies transport and status failures into the per-URL taxonomy so the
/// individual adapters only deal with extraction.
pub(crate) async fn fetch_page(session: &ParserSession, url: &str) -> PageFetch {
    let response = match session.client().get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let kind = if e.is_builder() {
                FailureKind::SessionCrashed
            } else {
                FailureKind::TransientNetwork
            };
            return PageFetch::Failed(ParseOutcome::failure(url, kind, e.to_string()));
        }
    };

    let status = response.status();
    if status.as_u16() == 404 || status.as_u16() == 410 {
        return PageFetch::Gone;
    }
    if status.as_u16() == 429 || status.as_u16() == 403 {
        return PageFetch::Failed(ParseOutcome::failure(
            url,
            FailureKind::RateLimitedOrBlocked,
            format!("HTTP {}", status),
        ));
    }
    if !status.is_success() {
        return PageFetch::Failed(ParseOutcome::failure(
            url,
            FailureKind::TransientNetwork,
            format!("HTTP {}", status),
        ));
    }

    match response.text().await {
        Ok(body) => PageFetch::Body(body),
        Err(e) => PageFetch::Failed(ParseOutcome::failure(
            url,
            FailureKind::TransientNetwork,
            e.to_string(),
        )),
    }
}
