use crate::feed::{FeedError, FeedResult, SnapshotSink, UrlSource};
use crate::marketplace::Marketplace;
use crate::model::{PendingProduct, ProductSnapshot};
use crate::WatchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Client for the remote product table API
///
/// The API exposes one table per marketplace: `get_data/{key}` lists tracked
/// products, `set_data/{key}` upserts scraped rows by articul.
pub struct TableApi {
    base_url: String,
    http: reqwest::Client,
}

impl TableApi {
    pub fn new(base_url: &str) -> Result<Self, WatchError> {
        // Parse up front so a typo fails at startup, not mid-cycle.
        Url::parse(base_url)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn get_data_url(&self, marketplace: Marketplace) -> String {
        format!("{}/api_table/get_data/{}", self.base_url, marketplace.api_key())
    }

    fn set_data_url(&self, marketplace: Marketplace) -> String {
        format!("{}/api_table/set_data/{}", self.base_url, marketplace.api_key())
    }
}

/// One row of the pending-products listing
///
/// Rows missing a URL are skipped; a missing articul is tolerated because
/// some adapters can recover it from the page.
#[derive(Debug, Deserialize)]
struct PendingRow {
    #[serde(default)]
    product_url: Option<String>,
    #[serde(default)]
    articul: Option<String>,
}

/// The upsert payload shape the table API expects
///
/// Delivery fields are always empty strings — the API requires the keys but
/// the scraper does not track delivery offers.
#[derive(Debug, Serialize)]
struct SnapshotPayload<'a> {
    articul: &'a str,
    product_url: &'a str,
    is_available: bool,
    price: u64,
    delivery_price: &'static str,
    delivery_date: &'static str,
    total_reviews: u64,
    rating: f64,
    updated_at: String,
}

impl<'a> From<&'a ProductSnapshot> for SnapshotPayload<'a> {
    fn from(snapshot: &'a ProductSnapshot) -> Self {
        Self {
            articul: &snapshot.articul,
            product_url: &snapshot.product_url,
            is_available: snapshot.is_available,
            price: snapshot.price.unwrap_or(0),
            delivery_price: "",
            delivery_date: "",
            total_reviews: snapshot.review_count.unwrap_or(0),
            rating: snapshot.rating.unwrap_or(0.0),
            updated_at: snapshot.captured_at.to_rfc3339(),
        }
    }
}

#[async_trait]
impl UrlSource for TableApi {
    async fn pending_products(
        &self,
        marketplace: Marketplace,
    ) -> FeedResult<Vec<PendingProduct>> {
        let response = self.http.get(self.get_data_url(marketplace)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let rows: Vec<PendingRow> = response.json().await?;
        let products = rows
            .into_iter()
            .filter_map(|row| {
                let url = row.product_url.filter(|u| !u.is_empty())?;
                Some(PendingProduct::new(url, row.articul.unwrap_or_default()))
            })
            .collect();

        Ok(products)
    }
}

#[async_trait]
impl SnapshotSink for TableApi {
    async fn send_batch(
        &self,
        marketplace: Marketplace,
        snapshots: &[ProductSnapshot],
    ) -> FeedResult<()> {
        let payloads: Vec<SnapshotPayload<'_>> = snapshots
            .iter()
            .filter(|s| {
                let complete = !s.product_url.is_empty() && !s.articul.is_empty();
                if !complete {
                    tracing::warn!("Skipping snapshot without url/articul: {}", s.product_url);
                }
                complete
            })
            .map(SnapshotPayload::from)
            .collect();

        if payloads.is_empty() {
            tracing::warn!("No valid snapshots to deliver for {}", marketplace);
            return Ok(());
        }

        let response = self
            .http
            .post(self.set_data_url(marketplace))
            .json(&payloads)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        tracing::info!("Delivered {} snapshots to {}", payloads.len(), marketplace);
        Ok(())
    }
}
