use crate::adapters::extract;
use crate::adapters::{fetch_page, PageFetch, SiteAdapter};
use crate::engine::ParserSession;
use crate::marketplace::Marketplace;
use crate::model::{FailureKind, ParseOutcome, PendingProduct, ProductSnapshot};
use async_trait::async_trait;
use scraper::Html;

/// Alibaba product page adapter
///
/// Alibaba lists prices as ranges ("US $1.20 - $3.50"); the lower bound is
/// what gets recorded.
pub struct AlibabaAdapter;

#[async_trait]
impl SiteAdapter for AlibabaAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Alibaba
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
                    Marketplace::Alibaba,
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

    if extract::selector_exists(&document, "div.product-unsafe") {
        return ParseOutcome::Success(ProductSnapshot::unavailable(
            Marketplace::Alibaba,
            &product.product_url,
            &product.articul,
        ));
    }

    let price = extract::select_first_text(&document, "div.price-list .price")
        .and_then(|text| extract::leading_number(&text))
        .map(|lower_bound| lower_bound.max(0.0).round() as u64);

    let review_count = extract::select_first_text(&document, "div.verified-reviews")
        .and_then(|text| extract::digits(&text));

    let rating = extract::select_first_text(&document, "div.score")
        .and_then(|text| extract::leading_number(&text));

    match price {
        Some(price) => ParseOutcome::Success(ProductSnapshot::available(
            Marketplace::Alibaba,
            &product.product_url,
            &product.articul,
            Some(price),
            rating,
            review_count,
        )),
        None => ParseOutcome::failure(
            &product.product_url,
            FailureKind::SiteStructureChanged,
            "no price found in price list",
        ),
    }
}
