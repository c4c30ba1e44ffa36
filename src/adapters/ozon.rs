use crate::adapters::extract;
use crate::adapters::{fetch_page, PageFetch, SiteAdapter};
use crate::engine::ParserSession;
use crate::marketplace::Marketplace;
use crate::model::{FailureKind, ParseOutcome, PendingProduct, ProductSnapshot};
use async_trait::async_trait;
use scraper::Html;

/// Ozon product page adapter
///
/// Ozon ships obfuscated, churn-prone class names, so the widget data
/// attributes are the stable anchors: `webOutOfStock` for availability,
/// `webPrice` as the price fallback. The rating line renders as
/// "4.8 • 14 006 отзывов" in one element.
pub struct OzonAdapter;

#[async_trait]
impl SiteAdapter for OzonAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Ozon
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
                    Marketplace::Ozon,
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

    if extract::selector_exists(&document, r#"div[data-widget="webOutOfStock"]"#) {
        return ParseOutcome::Success(ProductSnapshot::unavailable(
            Marketplace::Ozon,
            &product.product_url,
            &product.articul,
        ));
    }

    let price = extract::select_first_text(&document, "span.l8t_27.tl8_27.l2u_27")
        .or_else(|| extract::select_first_text(&document, r#"div[data-widget="webPrice"]"#))
        .and_then(|text| extract::digits(&text));

    // "4.8 • 14 006 отзывов" — rating before the bullet, count after it.
    let review_line = extract::select_first_text(&document, "div.ga121-a2.tsBodyControl500Medium");
    let rating = review_line
        .as_deref()
        .and_then(extract::leading_number);
    let review_count = review_line
        .as_deref()
        .and_then(|line| line.split('•').nth(1))
        .and_then(extract::digits);

    match price {
        Some(price) => ParseOutcome::Success(ProductSnapshot::available(
            Marketplace::Ozon,
            &product.product_url,
            &product.articul,
            Some(price),
            rating,
            review_count,
        )),
        None => ParseOutcome::failure(
            &product.product_url,
            FailureKind::SiteStructureChanged,
            "no price widget found on page",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> PendingProduct {
        PendingProduct::new("https://www.ozon.ru/product/123456/", "123456")
    }

    #[test]
    fn test_extract_full_page() {
        let html = r#"<html><body>
            <span class="l8t_27 tl8_27 l2u_27">14 990 ₽</span>
            <div class="ga121-a2 tsBodyControl500Medium">4.8 • 14 006 отзывов</div>
            </body></html>"#;

        match extract_product(html, &product()) {
            ParseOutcome::Success(snapshot) => {
                assert!(snapshot.is_available);
                assert_eq!(snapshot.price, Some(14990));
                assert_eq!(snapshot.rating, Some(4.8));
                assert_eq!(snapshot.review_count, Some(14006));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_price_widget_fallback() {
        let html = r#"<html><body>
            <div data-widget="webPrice">12 500 ₽</div>
            </body></html>"#;

        match extract_product(html, &product()) {
            ParseOutcome::Success(snapshot) => {
                assert_eq!(snapshot.price, Some(12500));
                assert_eq!(snapshot.rating, None);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_stock_widget() {
        let html = r#"<html><body>
            <div data-widget="webOutOfStock">Товар закончился</div>
            </body></html>"#;

        match extract_product(html, &product()) {
            ParseOutcome::Success(snapshot) => {
                assert!(!snapshot.is_available);
                assert_eq!(snapshot.price, Some(0));
                assert_eq!(snapshot.rating, Some(0.0));
            }
            other => panic!("expected unavailable snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_page_is_structure_failure() {
        let outcome = extract_product("<html></html>", &product());
        assert_eq!(
            outcome.failure_kind(),
            Some(FailureKind::SiteStructureChanged)
        );
    }
}
