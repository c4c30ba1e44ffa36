//! Shared extraction helpers for the site adapters

use scraper::{Html, Selector};

/// Collects every parseable JSON-LD block from a page
pub(crate) fn json_ld_blocks(document: &Html) -> Vec<serde_json::Value> {
    let mut blocks = Vec::new();

    if let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) {
        for element in document.select(&selector) {
            let text = element.text().collect::<String>();
            if let Ok(value) = serde_json::from_str(&text) {
                blocks.push(value);
            }
        }
    }

    blocks
}

/// Extracts the JSON object assigned right after `marker` in inline script
/// text
///
/// Marketplace pages often park their review/rating state in a plain
/// `<script>` assignment like `BACKEND.components.productReviews = {...}`.
/// This scans from the marker to the matching closing brace, skipping string
/// literals, and parses the slice as JSON.
pub(crate) fn embedded_object(html: &str, marker: &str) -> Option<serde_json::Value> {
    let after_marker = &html[html.find(marker)? + marker.len()..];
    let start = after_marker.find('{')?;
    let bytes = after_marker.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &after_marker[start..=offset];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }

    None
}

/// Folds all ASCII digits of a string into one number
///
/// Handles thousand separators the way the marketplaces render them:
/// "14 006" becomes 14006, "1 299 ₸" becomes 1299.
pub(crate) fn digits(text: &str) -> Option<u64> {
    let collected: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if collected.is_empty() {
        return None;
    }
    collected.parse().ok()
}

/// Parses the first decimal number in a string, tolerating a comma decimal
/// separator ("4,8" and "4.8" both parse to 4.8)
pub(crate) fn leading_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut token = String::new();
    let mut seen_separator = false;

    for c in text[start..].chars() {
        match c {
            '0'..='9' => token.push(c),
            '.' | ',' if !seen_separator => {
                seen_separator = true;
                token.push('.');
            }
            _ => break,
        }
    }

    // A trailing separator ("4.") still parses; an empty token cannot happen
    // because we started at a digit.
    token.trim_end_matches('.').parse().ok()
}

/// Text content of the first element matching `selector`, trimmed
pub(crate) fn select_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Whether any element matches `selector`
pub(crate) fn selector_exists(document: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_ld_blocks() {
        let html = Html::parse_document(
            r#"<html><head>
            <script type="application/ld+json">{"@type": "Product", "sku": "A1"}</script>
            <script type="application/ld+json">not json</script>
            <script>var other = 1;</script>
            </head></html>"#,
        );

        let blocks = json_ld_blocks(&html);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["sku"], "A1");
    }

    #[test]
    fn test_embedded_object() {
        let html = r#"<script>
            BACKEND.components.productReviews = {"rating": {"global": 4.8, "ratingCount": 120}};
            BACKEND.components.other = {};
        </script>"#;

        let value = embedded_object(html, "BACKEND.components.productReviews").unwrap();
        assert_eq!(value["rating"]["ratingCount"], 120);
    }

    #[test]
    fn test_embedded_object_with_nested_braces_and_strings() {
        let html = r#"X = {"a": {"b": "братья {не} скобки"}, "c": 1}; tail"#;
        let value = embedded_object(html, "X =").unwrap();
        assert_eq!(value["c"], 1);
    }

    #[test]
    fn test_embedded_object_missing_marker() {
        assert!(embedded_object("<html></html>", "MISSING").is_none());
    }

    #[test]
    fn test_digits() {
        assert_eq!(digits("14 006"), Some(14006));
        assert_eq!(digits("1 299 ₸"), Some(1299));
        assert_eq!(digits("no numbers"), None);
        assert_eq!(digits(""), None);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("4.8 • 14 006 reviews"), Some(4.8));
        assert_eq!(leading_number("4,88"), Some(4.88));
        assert_eq!(leading_number("US $1.20 - $3.50"), Some(1.2));
        assert_eq!(leading_number("score: 5"), Some(5.0));
        assert_eq!(leading_number("none"), None);
    }

    #[test]
    fn test_select_first_text() {
        let html = Html::parse_document(
            r#"<div><span class="price">  1 299 ₸ </span><span class="price">2</span></div>"#,
        );
        assert_eq!(
            select_first_text(&html, "span.price"),
            Some("1 299 ₸".to_string())
        );
        assert_eq!(select_first_text(&html, "span.missing"), None);
    }

    #[test]
    fn test_selector_exists() {
        let html = Html::parse_document(r#"<p class="sold-out-product">gone</p>"#);
        assert!(selector_exists(&html, "p.sold-out-product"));
        assert!(!selector_exists(&html, "div.out-of-stock"));
    }
}
