use crate::marketplace::Marketplace;
use chrono::{DateTime, Utc};

/// One unit of pending work from the URL source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProduct {
    /// Product page URL to scrape
    pub product_url: String,

    /// The marketplace-provided SKU identifier, used as the sink's upsert key
    pub articul: String,
}

impl PendingProduct {
    pub fn new(product_url: impl Into<String>, articul: impl Into<String>) -> Self {
        Self {
            product_url: product_url.into(),
            articul: articul.into(),
        }
    }
}

/// A point-in-time scrape result for a single product URL
///
/// Numeric fields are `None` when the page did not expose them. Snapshots are
/// normalized before leaving the adapter layer: an unavailable product always
/// carries the canonical zero sentinel in every numeric field, never stale
/// values from an earlier cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub marketplace: Marketplace,
    pub product_url: String,
    pub articul: String,
    pub is_available: bool,
    pub price: Option<u64>,
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    pub captured_at: DateTime<Utc>,
}

impl ProductSnapshot {
    /// Creates a snapshot for an available product, normalizing on the way
    pub fn available(
        marketplace: Marketplace,
        product_url: impl Into<String>,
        articul: impl Into<String>,
        price: Option<u64>,
        rating: Option<f64>,
        review_count: Option<u64>,
    ) -> Self {
        Self {
            marketplace,
            product_url: product_url.into(),
            articul: articul.into(),
            is_available: true,
            price,
            rating: rating.map(clamp_rating),
            review_count,
            captured_at: Utc::now(),
        }
    }

    /// Creates a snapshot for an unavailable product
    ///
    /// All numeric fields carry the zero sentinel.
    pub fn unavailable(
        marketplace: Marketplace,
        product_url: impl Into<String>,
        articul: impl Into<String>,
    ) -> Self {
        Self {
            marketplace,
            product_url: product_url.into(),
            articul: articul.into(),
            is_available: false,
            price: Some(0),
            rating: Some(0.0),
            review_count: Some(0),
            captured_at: Utc::now(),
        }
    }

    /// Enforces the unavailable-implies-zeroed invariant
    ///
    /// Adapters construct snapshots through [`available`](Self::available) and
    /// [`unavailable`](Self::unavailable), but anything that toggled
    /// `is_available` afterwards goes through here before delivery.
    pub fn normalized(mut self) -> Self {
        if !self.is_available {
            self.price = Some(0);
            self.rating = Some(0.0);
            self.review_count = Some(0);
        }
        self
    }
}

fn clamp_rating(rating: f64) -> f64 {
    rating.clamp(0.0, 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_zeroes_numeric_fields() {
        let snapshot =
            ProductSnapshot::unavailable(Marketplace::Kaspi, "https://kaspi.kz/p/1", "A1");

        assert!(!snapshot.is_available);
        assert_eq!(snapshot.price, Some(0));
        assert_eq!(snapshot.rating, Some(0.0));
        assert_eq!(snapshot.review_count, Some(0));
    }

    #[test]
    fn test_available_keeps_fields() {
        let snapshot = ProductSnapshot::available(
            Marketplace::Ozon,
            "https://ozon.ru/product/1",
            "B2",
            Some(14990),
            Some(4.8),
            Some(14006),
        );

        assert!(snapshot.is_available);
        assert_eq!(snapshot.price, Some(14990));
        assert_eq!(snapshot.rating, Some(4.8));
        assert_eq!(snapshot.review_count, Some(14006));
    }

    #[test]
    fn test_available_clamps_rating() {
        let snapshot = ProductSnapshot::available(
            Marketplace::Wildberries,
            "https://wildberries.ru/catalog/1",
            "C3",
            None,
            Some(8.7),
            None,
        );
        assert_eq!(snapshot.rating, Some(5.0));
    }

    #[test]
    fn test_normalized_forces_sentinel_on_unavailable() {
        let mut snapshot = ProductSnapshot::available(
            Marketplace::Kaspi,
            "https://kaspi.kz/p/2",
            "D4",
            Some(5000),
            Some(4.2),
            Some(17),
        );
        snapshot.is_available = false;

        let normalized = snapshot.normalized();
        assert_eq!(normalized.price, Some(0));
        assert_eq!(normalized.rating, Some(0.0));
        assert_eq!(normalized.review_count, Some(0));
    }

    #[test]
    fn test_normalized_leaves_available_untouched() {
        let snapshot = ProductSnapshot::available(
            Marketplace::Alibaba,
            "https://alibaba.com/product-detail/1.html",
            "E5",
            Some(120),
            Some(4.9),
            Some(33),
        );
        let normalized = snapshot.clone().normalized();
        assert_eq!(normalized, snapshot);
    }
}
