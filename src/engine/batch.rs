//! Batch dispatch and aggregation
//!
//! Turns "marketplace + URL list" into sink deliveries. URLs are processed
//! in contiguous batches; within a batch every URL is dispatched
//! concurrently through the session pool, all outcomes are awaited, and the
//! successes go to the sink as one delivery. A URL-level failure never fails
//! its batch, and a failed delivery never stops later batches.

use crate::adapters::{AdapterRegistry, SiteAdapter};
use crate::engine::pool::ParserPool;
use crate::engine::report::MarketplaceReport;
use crate::feed::SnapshotSink;
use crate::marketplace::Marketplace;
use crate::model::{FailureKind, ParseOutcome, PendingProduct};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Stateless orchestrator over pool + adapters + sink
pub struct BatchProcessor {
    pool: Arc<ParserPool>,
    adapters: Arc<AdapterRegistry>,
    sink: Arc<dyn SnapshotSink>,
    batch_size: usize,
    parse_timeout: Duration,
}

impl BatchProcessor {
    pub fn new(
        pool: Arc<ParserPool>,
        adapters: Arc<AdapterRegistry>,
        sink: Arc<dyn SnapshotSink>,
        batch_size: usize,
        parse_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            adapters,
            sink,
            batch_size,
            parse_timeout,
        }
    }

    /// Processes every pending product of one marketplace
    ///
    /// Never returns an error: everything that can go wrong is folded into
    /// the report and the log.
    pub async fn process_marketplace(
        &self,
        marketplace: Marketplace,
        pending: Vec<PendingProduct>,
    ) -> MarketplaceReport {
        let mut report = MarketplaceReport::new(marketplace);

        let adapter = match self.adapters.get(marketplace) {
            Some(adapter) => adapter,
            None => {
                tracing::error!("No adapter registered for {}", marketplace);
                report.processed = pending.len() as u64;
                report.failed = pending.len() as u64;
                return report;
            }
        };

        let batch_count = pending.len().div_ceil(self.batch_size);
        for (index, batch) in pending.chunks(self.batch_size).enumerate() {
            tracing::debug!(
                "Dispatching batch {}/{} for {} ({} URLs)",
                index + 1,
                batch_count,
                marketplace,
                batch.len()
            );
            self.process_batch(marketplace, Arc::clone(&adapter), batch, &mut report)
                .await;
        }

        tracing::info!("{}", report);
        report
    }

    async fn process_batch(
        &self,
        marketplace: Marketplace,
        adapter: Arc<dyn SiteAdapter>,
        batch: &[PendingProduct],
        report: &mut MarketplaceReport,
    ) {
        let mut tasks = JoinSet::new();
        for product in batch.iter().cloned() {
            tasks.spawn(dispatch_one(
                Arc::clone(&self.pool),
                Arc::clone(&adapter),
                product,
                self.parse_timeout,
            ));
        }

        // Everything is awaited before delivery; completion order within the
        // batch does not matter because correspondence is by articul.
        let mut successes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            report.processed += 1;
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Parse task died: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            match outcome {
                ParseOutcome::Success(snapshot) => successes.push(snapshot.normalized()),
                ParseOutcome::Failure { url, kind, message } => {
                    report.failed += 1;
                    if kind == FailureKind::RateLimitedOrBlocked {
                        report.blocked += 1;
                    }
                    tracing::warn!("Parse failed for {} ({}): {}", url, kind, message);
                }
            }
        }

        report.succeeded += successes.len() as u64;

        if successes.is_empty() {
            tracing::debug!("Nothing to deliver for {} in this batch", marketplace);
            return;
        }

        if let Err(e) = self.sink.send_batch(marketplace, &successes).await {
            report.sink_failures += 1;
            tracing::error!("Sink delivery failed for {}: {}", marketplace, e);
        }
    }
}

/// One URL through pool, adapter and timeout
///
/// The session guard is dropped on every exit path; a crashed-session
/// outcome flags the session so the drop discards it instead of returning it.
async fn dispatch_one(
    pool: Arc<ParserPool>,
    adapter: Arc<dyn SiteAdapter>,
    product: PendingProduct,
    parse_timeout: Duration,
) -> ParseOutcome {
    let mut session = match pool.acquire().await {
        Ok(session) => session,
        Err(e) => {
            return ParseOutcome::failure(
                &product.product_url,
                FailureKind::SessionCrashed,
                e.to_string(),
            )
        }
    };

    let outcome = match tokio::time::timeout(
        parse_timeout,
        adapter.parse_product(session.session(), &product),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(_) => ParseOutcome::failure(
            &product.product_url,
            FailureKind::TransientNetwork,
            format!("parse timed out after {:?}", parse_timeout),
        ),
    };

    if outcome.failure_kind() == Some(FailureKind::SessionCrashed) {
        session.mark_unhealthy();
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::session::ParserSession;
    use crate::feed::{FeedError, FeedResult};
    use crate::model::ProductSnapshot;
    use crate::proxy::ProxyManager;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Adapter scripted by URL substring: "fail" fails, "crash" crashes the
    /// session, "block" reports a block, anything else succeeds.
    struct ScriptedAdapter {
        marketplace: Marketplace,
    }

    #[async_trait]
    impl SiteAdapter for ScriptedAdapter {
        fn marketplace(&self) -> Marketplace {
            self.marketplace
        }

        async fn parse_product(
            &self,
            _session: &ParserSession,
            product: &PendingProduct,
        ) -> ParseOutcome {
            let url = &product.product_url;
            if url.contains("crash") {
                ParseOutcome::failure(url, FailureKind::SessionCrashed, "handle died")
            } else if url.contains("block") {
                ParseOutcome::failure(url, FailureKind::RateLimitedOrBlocked, "HTTP 429")
            } else if url.contains("fail") {
                ParseOutcome::failure(url, FailureKind::SiteStructureChanged, "no data")
            } else {
                ParseOutcome::Success(ProductSnapshot::available(
                    self.marketplace,
                    url.clone(),
                    product.articul.clone(),
                    Some(1000),
                    Some(4.5),
                    Some(10),
                ))
            }
        }
    }

    /// Sink that records every delivery and optionally fails them all
    struct RecordingSink {
        calls: Mutex<Vec<(Marketplace, Vec<ProductSnapshot>)>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, snapshots)| snapshots.len())
                .collect()
        }
    }

    #[async_trait]
    impl SnapshotSink for RecordingSink {
        async fn send_batch(
            &self,
            marketplace: Marketplace,
            snapshots: &[ProductSnapshot],
        ) -> FeedResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((marketplace, snapshots.to_vec()));
            if self.fail {
                Err(FeedError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn processor(
        capacity: usize,
        batch_size: usize,
        sink: Arc<RecordingSink>,
    ) -> (BatchProcessor, Arc<ParserPool>) {
        let proxy = Arc::new(
            ProxyManager::new(vec![], None, None, None, Duration::from_secs(600)).unwrap(),
        );
        let pool = Arc::new(ParserPool::new(
            capacity,
            "pricewatch-test/1.0".to_string(),
            Duration::from_secs(5),
            proxy,
        ));
        let mut registry = AdapterRegistry::empty();
        registry.insert(Arc::new(ScriptedAdapter {
            marketplace: Marketplace::Kaspi,
        }));

        let processor = BatchProcessor::new(
            Arc::clone(&pool),
            Arc::new(registry),
            sink,
            batch_size,
            Duration::from_secs(5),
        );
        (processor, pool)
    }

    fn pending(count: usize) -> Vec<PendingProduct> {
        (0..count)
            .map(|i| PendingProduct::new(format!("https://kaspi.kz/p/ok-{}", i), format!("A{}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_250_urls_make_three_batches() {
        let sink = Arc::new(RecordingSink::new(false));
        let (processor, _pool) = processor(3, 100, Arc::clone(&sink));

        let report = processor
            .process_marketplace(Marketplace::Kaspi, pending(250))
            .await;

        assert_eq!(report.processed, 250);
        assert_eq!(report.succeeded, 250);
        assert_eq!(report.failed, 0);
        assert_eq!(sink.batch_sizes(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_failures_are_not_delivered() {
        let sink = Arc::new(RecordingSink::new(false));
        let (processor, _pool) = processor(2, 10, Arc::clone(&sink));

        let mut products = pending(7);
        products.push(PendingProduct::new("https://kaspi.kz/p/fail-1", "F1"));
        products.push(PendingProduct::new("https://kaspi.kz/p/fail-2", "F2"));
        products.push(PendingProduct::new("https://kaspi.kz/p/block-1", "B1"));

        let report = processor
            .process_marketplace(Marketplace::Kaspi, products)
            .await;

        assert_eq!(report.processed, 10);
        assert_eq!(report.succeeded, 7);
        assert_eq!(report.failed, 3);
        assert_eq!(report.blocked, 1);

        // One batch, one delivery, only the successes in it.
        assert_eq!(sink.batch_sizes(), vec![7]);
        let calls = sink.calls.lock().unwrap();
        assert!(calls[0].1.iter().all(|s| s.is_available));
    }

    #[tokio::test]
    async fn test_fully_failed_batch_skips_sink() {
        let sink = Arc::new(RecordingSink::new(false));
        let (processor, _pool) = processor(2, 10, Arc::clone(&sink));

        let products = vec![
            PendingProduct::new("https://kaspi.kz/p/fail-1", "F1"),
            PendingProduct::new("https://kaspi.kz/p/fail-2", "F2"),
        ];
        let report = processor
            .process_marketplace(Marketplace::Kaspi, products)
            .await;

        assert_eq!(report.failed, 2);
        assert!(sink.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_later_batches() {
        let sink = Arc::new(RecordingSink::new(true));
        let (processor, _pool) = processor(2, 5, Arc::clone(&sink));

        let report = processor
            .process_marketplace(Marketplace::Kaspi, pending(12))
            .await;

        // Three batches, all delivered (and all failed at the sink).
        assert_eq!(sink.batch_sizes(), vec![5, 5, 2]);
        assert_eq!(report.sink_failures, 3);
        assert_eq!(report.processed, 12);
        assert_eq!(report.succeeded, 12);
    }

    #[tokio::test]
    async fn test_session_crash_is_isolated_and_pool_recovers() {
        let sink = Arc::new(RecordingSink::new(false));
        let (processor, pool) = processor(1, 10, Arc::clone(&sink));

        let mut products = pending(4);
        products.insert(2, PendingProduct::new("https://kaspi.kz/p/crash-1", "C1"));

        let report = processor
            .process_marketplace(Marketplace::Kaspi, products)
            .await;

        assert_eq!(report.processed, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(sink.batch_sizes(), vec![4]);

        // The crashed session was discarded but capacity survived.
        assert_eq!(pool.available_permits(), 1);
        let replacement = pool.acquire().await.unwrap();
        drop(replacement);
    }

    #[tokio::test]
    async fn test_missing_adapter_fails_whole_set() {
        let sink = Arc::new(RecordingSink::new(false));
        let (processor, _pool) = processor(2, 10, Arc::clone(&sink));

        // Ozon was never registered in this processor's registry.
        let report = processor
            .process_marketplace(Marketplace::Ozon, pending(3))
            .await;

        assert_eq!(report.processed, 3);
        assert_eq!(report.failed, 3);
        assert!(sink.batch_sizes().is_empty());
    }
}
