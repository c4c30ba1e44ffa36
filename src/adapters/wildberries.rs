use crate::adapters::extract;
use crate::adapters::{fetch_page, PageFetch, SiteAdapter};
use crate::engine::ParserSession;
use crate::marketplace::Marketplace;
use crate::model::{FailureKind, ParseOutcome, PendingProduct, ProductSnapshot};
use async_trait::async_trait;
use scraper::Html;

/// Wildberries product page adapter
///
/// The price block renders under several class names depending on wallet
/// promotions, so a selector list is tried in order.
pub struct WildberriesAdapter;

const PRICE_SELECTORS: [&str; 2] = [
    "span.price-block__wallet-price",
    "ins.price-block__final-price",
];

#[async_trait]
impl SiteAdapter for WildberriesAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Wildberries
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
                    Marketplace::Wildberries,
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

    if extract::selector_exists(&document, "p.sold-out-product") {
        return ParseOutcome::Success(ProductSnapshot::unavailable(
            Marketplace::Wildberries,
            &product.product_url,
            &product.articul,
        ));
    }

    let price = PRICE_SELECTORS.iter().find_map(|selector| {
        extract::select_first_text(&document, selector).and_then(|text| extract::digits(&text))
    });

    let rating = extract::select_first_text(&document, "span.product-review__rating")
        .and_then(|text| extract::leading_number(&text));

    let review_count = extract::select_first_text(&document, "span.product-review__count-review")
        .and_then(|text| extract::digits(&text));

    match price {
        Some(price) => ParseOutcome::Success(ProductSnapshot::available(
            Marketplace::Wildberries,
            &product.product_url,
            &product.articul,
            Some(price),
            rating,
            review_count,
        )),
        None => ParseOutcome::failure(
            &product.product_url,
            FailureKind::SiteStructureChanged,
            "no price element matched any known selector",
        ),
    }
}
