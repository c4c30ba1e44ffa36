//! Per-marketplace and per-cycle counters

use crate::marketplace::Marketplace;
use std::fmt;

/// Outcome counters for one marketplace within a cycle
#[derive(Debug, Clone)]
pub struct MarketplaceReport {
    pub marketplace: Marketplace,

    /// URLs dispatched (success or failure)
    pub processed: u64,

    /// Parses that produced a snapshot
    pub succeeded: u64,

    /// Parses that produced a failure outcome
    pub failed: u64,

    /// Subset of `failed` caused by blocks or rate limiting
    pub blocked: u64,

    /// Batches whose sink delivery failed
    pub sink_failures: u64,
}

impl MarketplaceReport {
    pub fn new(marketplace: Marketplace) -> Self {
        Self {
            marketplace,
            processed: 0,
            succeeded: 0,
            failed: 0,
            blocked: 0,
            sink_failures: 0,
        }
    }
}

impl fmt::Display for MarketplaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} succeeded, {} failed ({} blocked), {} sink failures",
            self.marketplace,
            self.processed,
            self.succeeded,
            self.failed,
            self.blocked,
            self.sink_failures
        )
    }
}

/// Aggregated counters for one full cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub reports: Vec<MarketplaceReport>,

    /// Marketplaces whose URL source call failed this cycle
    pub source_errors: u64,
}

impl CycleReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: MarketplaceReport) {
        self.reports.push(report);
    }

    pub fn total_processed(&self) -> u64 {
        self.reports.iter().map(|r| r.processed).sum()
    }

    pub fn total_succeeded(&self) -> u64 {
        self.reports.iter().map(|r| r.succeeded).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.reports.iter().map(|r| r.failed).sum()
    }

    pub fn total_blocked(&self) -> u64 {
        self.reports.iter().map(|r| r.blocked).sum()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} marketplaces, {} processed, {} succeeded, {} failed",
            self.reports.len(),
            self.total_processed(),
            self.total_succeeded(),
            self.total_failed()
        )?;
        if self.source_errors > 0 {
            write!(f, ", {} source errors", self.source_errors)?;
        }
        Ok(())
    }
}
