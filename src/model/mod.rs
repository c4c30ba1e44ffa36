//! Core data model
//!
//! The types every component exchanges: pending work items from the URL
//! source, point-in-time product snapshots, and the tagged outcome of a
//! single parse attempt.

mod outcome;
mod snapshot;

pub use outcome::{FailureKind, ParseOutcome};
pub use snapshot::{PendingProduct, ProductSnapshot};
