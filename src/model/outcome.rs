use crate::model::ProductSnapshot;
use std::fmt;

/// Classification of a failed parse attempt
///
/// This is data, not an error type: failures travel through the batch
/// processor as values and end up in reports and logs. None of them abort a
/// batch, and none of them trigger an in-cycle retry — the URL simply comes
/// around again next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, connection failure or another transient transport problem
    TransientNetwork,

    /// The page loaded but the expected product data could not be located
    SiteStructureChanged,

    /// The marketplace answered with a block or rate-limit response
    RateLimitedOrBlocked,

    /// The scraping session itself is broken and must be discarded
    SessionCrashed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::SiteStructureChanged => "site_structure_changed",
            Self::RateLimitedOrBlocked => "rate_limited_or_blocked",
            Self::SessionCrashed => "session_crashed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of parsing one product URL
///
/// Exactly one variant holds per dispatched URL. Adapters must resolve every
/// invocation to one of these; nothing is allowed to escape the adapter
/// boundary as a panic or error.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// The product page was parsed into a snapshot
    Success(ProductSnapshot),

    /// The URL could not be parsed this cycle
    Failure {
        url: String,
        kind: FailureKind,
        message: String,
    },
}

impl ParseOutcome {
    /// Shorthand for building a failure outcome
    pub fn failure(url: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            url: url.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the failure kind, if this outcome is a failure
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::Marketplace;

    #[test]
    fn test_failure_shorthand() {
        let outcome = ParseOutcome::failure(
            "https://kaspi.kz/p/1",
            FailureKind::TransientNetwork,
            "connection reset",
        );

        assert!(!outcome.is_success());
        assert_eq!(outcome.failure_kind(), Some(FailureKind::TransientNetwork));
    }

    #[test]
    fn test_success_has_no_failure_kind() {
        let snapshot =
            ProductSnapshot::unavailable(Marketplace::Kaspi, "https://kaspi.kz/p/1", "A1");
        let outcome = ParseOutcome::Success(snapshot);

        assert!(outcome.is_success());
        assert_eq!(outcome.failure_kind(), None);
    }

    #[test]
    fn test_failure_kind_strings() {
        assert_eq!(FailureKind::TransientNetwork.as_str(), "transient_network");
        assert_eq!(FailureKind::SessionCrashed.as_str(), "session_crashed");
        assert_eq!(
            FailureKind::RateLimitedOrBlocked.to_string(),
            "rate_limited_or_blocked"
        );
    }
}
