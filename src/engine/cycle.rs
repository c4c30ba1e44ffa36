//! The cycle scheduler
//!
//! Drives the infinite watch loop: one cycle visits every configured
//! marketplace in order, hands its pending URLs to the batch processor, and
//! sleeps out the remainder of the cycle interval. A marketplace failing —
//! its URL source call or anything below it — is logged and skipped, never
//! fatal; only a shutdown signal ends the loop.

use crate::config::Config;
use crate::engine::batch::BatchProcessor;
use crate::engine::report::CycleReport;
use crate::feed::UrlSource;
use crate::marketplace::Marketplace;
use crate::proxy::{ProxyManager, RotateOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Scheduling knobs, extracted from [`Config`]
#[derive(Debug, Clone)]
pub struct CycleOptions {
    /// Marketplaces in visit order; the order is fixed across cycles
    pub marketplaces: Vec<Marketplace>,
    pub cycle_interval: Duration,
    pub inter_marketplace_delay: Duration,
    /// Sleep before retrying after a cycle that found no work at all
    pub retry_interval: Duration,
    /// Egress IP to rebind to when too many requests come back blocked
    pub rebind_ip: Option<String>,
    pub blocked_rebind_threshold: u64,
}

impl CycleOptions {
    pub fn from_config(config: &Config) -> Self {
        let marketplaces = config
            .scraper
            .marketplaces
            .iter()
            .filter_map(|key| Marketplace::from_key(key))
            .collect();

        Self {
            marketplaces,
            cycle_interval: config.scraper.cycle_interval(),
            inter_marketplace_delay: config.scraper.inter_marketplace_delay(),
            retry_interval: config.scraper.retry_interval(),
            rebind_ip: config.proxy.rebind_ip.clone(),
            blocked_rebind_threshold: config.proxy.blocked_rebind_threshold,
        }
    }
}

/// The watch loop driver
pub struct CycleRunner {
    options: CycleOptions,
    source: Arc<dyn UrlSource>,
    processor: BatchProcessor,
    proxy: Arc<ProxyManager>,
    shutdown: watch::Receiver<bool>,
}

impl CycleRunner {
    pub fn new(
        options: CycleOptions,
        source: Arc<dyn UrlSource>,
        processor: BatchProcessor,
        proxy: Arc<ProxyManager>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            options,
            source,
            processor,
            proxy,
            shutdown,
        }
    }

    /// Runs cycles until a shutdown signal arrives
    pub async fn run(&mut self) {
        tracing::info!(
            "Starting watch loop over {} marketplaces (cycle interval {:?})",
            self.options.marketplaces.len(),
            self.options.cycle_interval
        );

        loop {
            if self.shutdown_requested() {
                break;
            }

            let started = Instant::now();
            let report = self.run_cycle().await;

            // An entirely empty cycle means the source is down or the watch
            // lists are empty; a short retry beats sleeping the full interval.
            if report.total_processed() == 0 {
                tracing::warn!(
                    "Cycle produced no work ({} source errors); retrying in {:?}",
                    report.source_errors,
                    self.options.retry_interval
                );
                if self.sleep_or_shutdown(self.options.retry_interval).await {
                    break;
                }
                continue;
            }

            self.maybe_rotate_binding(&report).await;

            let elapsed = started.elapsed();
            let sleep_time = compute_sleep(self.options.cycle_interval, elapsed);
            tracing::info!(
                "Cycle completed in {:.2?} ({}); sleeping {:.2?}",
                elapsed,
                report,
                sleep_time
            );
            if self.sleep_or_shutdown(sleep_time).await {
                break;
            }
        }

        tracing::info!("Watch loop stopped");
    }

    /// Runs one full pass over the marketplace list
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut cycle = CycleReport::new();
        let marketplaces = self.options.marketplaces.clone();
        let last_index = marketplaces.len().saturating_sub(1);

        for (index, marketplace) in marketplaces.into_iter().enumerate() {
            if self.shutdown_requested() {
                break;
            }

            match self.source.pending_products(marketplace).await {
                Err(e) => {
                    tracing::error!("Failed to fetch pending products for {}: {}", marketplace, e);
                    cycle.source_errors += 1;
                }
                Ok(pending) if pending.is_empty() => {
                    tracing::debug!("Nothing to do for {} this cycle", marketplace);
                }
                Ok(pending) => {
                    tracing::info!("Processing {} products for {}", pending.len(), marketplace);
                    let report = self
                        .processor
                        .process_marketplace(marketplace, pending)
                        .await;
                    cycle.push(report);
                }
            }

            if index != last_index
                && self
                    .sleep_or_shutdown(self.options.inter_marketplace_delay)
                    .await
            {
                break;
            }
        }

        cycle
    }

    /// Requests an egress rebind after a block-heavy cycle
    async fn maybe_rotate_binding(&self, cycle: &CycleReport) {
        let Some(ip) = self.options.rebind_ip.clone() else {
            return;
        };
        if cycle.total_blocked() < self.options.blocked_rebind_threshold {
            return;
        }

        tracing::warn!(
            "{} blocked responses this cycle; requesting egress rebind",
            cycle.total_blocked()
        );
        match self.proxy.rotate_binding(&ip).await {
            RotateOutcome::Rotated { ip } => {
                tracing::info!("Egress binding rotated to {}", ip);
            }
            RotateOutcome::CoolingDown { remaining } => {
                tracing::info!("Rebind not allowed yet ({:?} of cooldown left)", remaining);
            }
            RotateOutcome::Unchanged { reason } => {
                tracing::warn!("Egress binding unchanged: {}", reason);
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleeps for `duration` unless shutdown interrupts; returns true on
    /// shutdown
    ///
    /// A dropped shutdown sender counts as a shutdown request.
    async fn sleep_or_shutdown(&mut self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.shutdown_requested();
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            changed = self.shutdown.changed() => match changed {
                Ok(()) => self.shutdown_requested(),
                Err(_) => true,
            },
        }
    }
}

/// Remaining sleep after a cycle; never negative
pub fn compute_sleep(cycle_interval: Duration, elapsed: Duration) -> Duration {
    cycle_interval.saturating_sub(elapsed)
}
