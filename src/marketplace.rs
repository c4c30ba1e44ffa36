//! Marketplace registry
//!
//! One closed set of supported marketplaces, used as the key for adapter
//! dispatch, feed endpoints and reports. Replaces string comparison scattered
//! through the call sites: a `Marketplace` value is proof the key was valid.

use url::Url;

/// A supported external marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marketplace {
    Kaspi,
    Wildberries,
    Ozon,
    Alibaba,
}

impl Marketplace {
    /// All supported marketplaces, in the default scan order
    pub const ALL: [Marketplace; 4] = [
        Marketplace::Kaspi,
        Marketplace::Wildberries,
        Marketplace::Ozon,
        Marketplace::Alibaba,
    ];

    /// The configuration key for this marketplace
    pub fn key(&self) -> &'static str {
        match self {
            Self::Kaspi => "kaspi",
            Self::Wildberries => "wildberries",
            Self::Ozon => "ozon",
            Self::Alibaba => "alibaba",
        }
    }

    /// The path segment the table API uses for this marketplace
    ///
    /// The upstream API abbreviates Wildberries to `wb`; everything else
    /// matches the configuration key.
    pub fn api_key(&self) -> &'static str {
        match self {
            Self::Wildberries => "wb",
            other => other.key(),
        }
    }

    /// Parses a configuration key into a marketplace
    ///
    /// Accepts both the canonical key and the API abbreviation, so lists
    /// copied from the upstream API configuration keep working.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "kaspi" => Some(Self::Kaspi),
            "wildberries" | "wb" => Some(Self::Wildberries),
            "ozon" => Some(Self::Ozon),
            "alibaba" => Some(Self::Alibaba),
            _ => None,
        }
    }

    /// Detects the marketplace a product URL belongs to
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_lowercase();
        if host.ends_with("kaspi.kz") {
            Some(Self::Kaspi)
        } else if host.contains("wildberries") {
            Some(Self::Wildberries)
        } else if host.contains("ozon") {
            Some(Self::Ozon)
        } else if host.contains("alibaba") {
            Some(Self::Alibaba)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
