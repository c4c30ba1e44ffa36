//! Proxy/egress management
//!
//! This module owns all egress state: which proxy endpoints sessions may use
//! and when the provider-side IP binding may be rotated. Nothing else in the
//! process mutates proxy state; callers go through [`ProxyManager`].

mod manager;

pub use manager::{EgressConfig, ProxyManager, RotateOutcome};
