//! Orchestration engine
//!
//! The concurrency core of pricewatch:
//! - a bounded pool of reusable parser sessions
//! - the batch processor dispatching URLs through the pool and delivering
//!   aggregated results
//! - the cycle scheduler looping over marketplaces forever
//!
//! [`run`] wires the whole thing together from a validated configuration.

mod batch;
mod cycle;
mod pool;
mod report;
mod session;

pub use batch::BatchProcessor;
pub use cycle::{compute_sleep, CycleOptions, CycleRunner};
pub use pool::{ParserPool, PoolError, PooledSession};
pub use report::{CycleReport, MarketplaceReport};
pub use session::ParserSession;

use crate::adapters::AdapterRegistry;
use crate::config::Config;
use crate::feed;
use crate::proxy::ProxyManager;
use crate::Result;
use std::sync::Arc;
use tokio::sync::watch;

/// Runs the watch loop until the shutdown signal fires
///
/// In-flight parses get to finish inside their own parse timeout before the
/// loop exits and the pool closes.
pub async fn run(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    let (mut runner, pool) = build_runner(&config, shutdown)?;
    runner.run().await;
    pool.close();
    Ok(())
}

/// Runs exactly one cycle and returns its report
///
/// Used by the `--once` CLI mode and handy for smoke-testing a new
/// configuration.
pub async fn run_once(config: Config) -> Result<CycleReport> {
    // The sender must outlive the cycle: dropping it reads as shutdown.
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (mut runner, pool) = build_runner(&config, shutdown_rx)?;
    let report = runner.run_cycle().await;
    pool.close();
    Ok(report)
}

fn build_runner(
    config: &Config,
    shutdown: watch::Receiver<bool>,
) -> Result<(CycleRunner, Arc<ParserPool>)> {
    let proxy = Arc::new(ProxyManager::from_config(&config.proxy)?);

    let pool = Arc::new(ParserPool::new(
        config.scraper.max_concurrent_parsers as usize,
        config.user_agent.header_value(),
        config.scraper.parse_timeout(),
        Arc::clone(&proxy),
    ));

    let adapters = Arc::new(AdapterRegistry::standard());
    let (source, sink) = feed::build(config)?;

    let processor = BatchProcessor::new(
        Arc::clone(&pool),
        adapters,
        sink,
        config.scraper.batch_size,
        config.scraper.parse_timeout(),
    );

    let runner = CycleRunner::new(
        CycleOptions::from_config(config),
        source,
        processor,
        proxy,
        shutdown,
    );

    Ok((runner, pool))
}
