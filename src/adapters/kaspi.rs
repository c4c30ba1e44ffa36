use crate::adapters::extract;
use crate::adapters::{fetch_page, PageFetch, SiteAdapter};
use crate::engine::ParserSession;
use crate::marketplace::Marketplace;
use crate::model::{FailureKind, ParseOutcome, PendingProduct, ProductSnapshot};
use async_trait::async_trait;
use scraper::Html;

/// Kaspi.kz product page adapter
///
/// Primary source is the JSON-LD `Product` block (offers carry price and
/// stock state); ratings come from the embedded
/// `BACKEND.components.productReviews` state object. Falls back to the price
/// element when the structured data is absent.
pub struct KaspiAdapter;

#[async_trait]
impl SiteAdapter for KaspiAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Kaspi
    }

    async fn parse_product(
        &self,
        session: &ParserSession,
        product: &PendingProduct,
    ) -> ParseOutcome {
        let body = match fetch_page(session, &product.product_url).await {
            PageFetch::Body(body) => body,
            PageFetch::Gone => {
                return ParseOutcome::Success(ProductSnapshot::unavailable(
                    Marketplace::Kaspi,
                    &product.product_url,
                    &product.articul,
                ))
            }
            PageFetch::Failed(outcome) => return outcome,
        };

        extract_product(&body, product)
    }
}

fn extract_product(html: &str, product: &PendingProduct) -> ParseOutcome {
    let document = Html::parse_document(html);

    if extract::selector_exists(&document, ".out-of-stock") {
        return ParseOutcome::Success(ProductSnapshot::unavailable(
            Marketplace::Kaspi,
            &product.product_url,
            &product.articul,
        ));
    }

    let mut price = None;
    let mut in_stock = None;
    let mut extracted_articul = None;

    for block in extract::json_ld_blocks(&document) {
        if block.get("@type").and_then(|v| v.as_str()) != Some("Product") {
            continue;
        }

        extracted_articul = block
            .get("productID")
            .or_else(|| block.get("sku"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if let Some(offers) = block.get("offers") {
            let offer_list: Vec<&serde_json::Value> = match offers {
                serde_json::Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };

            for offer in offer_list {
                if let Some(offer_price) = offer.get("price").and_then(price_value) {
                    price = Some(offer_price);
                    in_stock = Some(
                        offer
                            .get("availability")
                            .and_then(|v| v.as_str())
                            .map(|s| s.contains("InStock"))
                            .unwrap_or(true),
                    );
                    break;
                }
            }
        }
        break;
    }

    // Reviews live in the backend component state, not in JSON-LD.
    let reviews = extract::embedded_object(html, "BACKEND.components.productReviews");
    let rating = reviews.as_ref().and_then(|data| {
        data.pointer("/rating/global")
            .or_else(|| data.pointer("/productReviews/rating/global"))
            .and_then(|v| v.as_f64())
    });
    let review_count = reviews.as_ref().and_then(|data| {
        data.pointer("/rating/ratingCount")
            .or_else(|| data.pointer("/productReviews/reviewsCount"))
            .and_then(|v| v.as_u64())
    });

    if price.is_none() {
        price = extract::select_first_text(&document, "div.item__price-once")
            .and_then(|text| extract::digits(&text));
    }

    let articul = if product.articul.is_empty() {
        extracted_articul.unwrap_or_else(|| articul_from_url(&product.product_url))
    } else {
        product.articul.clone()
    };

    match price {
        Some(_) if in_stock == Some(false) => ParseOutcome::Success(ProductSnapshot::unavailable(
            Marketplace::Kaspi,
            &product.product_url,
            articul,
        )),
        Some(price) => ParseOutcome::Success(ProductSnapshot::available(
            Marketplace::Kaspi,
            &product.product_url,
            articul,
            Some(price),
            rating,
            review_count,
        )),
        None => ParseOutcome::failure(
            &product.product_url,
            FailureKind::SiteStructureChanged,
            "no product price found in JSON-LD or page markup",
        ),
    }
}

fn price_value(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(|f| f.max(0.0) as u64),
        serde_json::Value::String(s) => s.parse::<f64>().ok().map(|f| f.max(0.0) as u64),
        _ => None,
    }
}

/// Last-resort SKU: the trailing id segment of a Kaspi product URL
fn articul_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .rsplit('-')
        .next()
        .unwrap_or_default()
        .split('?')
        .next()
        .unwrap_or_default()
        .to_string()
}
