use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::constants::{MISSING_VENDOR_CODE, UNTITLED_PRODUCT};
use crate::normalize::fields::{first_present, first_text, CARD_ID, CARD_TITLE, CARD_VENDOR_CODE};
use crate::normalize::photo::select_photo_url;
use crate::observability::metrics;
use crate::types::Product;

/// Turn raw cards (in fetch order) into a deduplicated, sorted product list.
///
/// Cards without a usable identifier are dropped; for repeated identifiers the
/// first card wins. The result is ordered by case-insensitive title, then id.
pub fn normalize_products(cards: &[Value]) -> Vec<Product> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut products = Vec::with_capacity(cards.len());
    let mut dropped = 0usize;

    for card in cards {
        let Some(id) = first_present(card, CARD_ID).and_then(parse_card_id) else {
            dropped += 1;
            continue;
        };
        if !seen.insert(id) {
            dropped += 1;
            continue;
        }
        products.push(build_product(id, card));
    }

    products.sort_by_cached_key(|p| (title_sort_key(&p.title), p.id));

    if dropped > 0 {
        debug!(dropped, "Dropped cards without id or with duplicate id");
        metrics::catalog::cards_dropped(dropped);
    }
    metrics::catalog::products_normalized(products.len());
    products
}

/// Lowercased title with `ё` folded into `е`, which keeps Russian titles in
/// dictionary order under code-point comparison.
fn title_sort_key(title: &str) -> String {
    title.to_lowercase().replace('ё', "е")
}

fn build_product(id: i64, card: &Value) -> Product {
    Product {
        id,
        title: first_text(card, CARD_TITLE).unwrap_or_else(|| UNTITLED_PRODUCT.to_string()),
        vendor_code: first_text(card, CARD_VENDOR_CODE)
            .unwrap_or_else(|| MISSING_VENDOR_CODE.to_string()),
        photo_url: select_photo_url(card),
    }
}

/// Card ids arrive as numbers or numeric strings. Anything that is not a
/// finite number is rejected; fractional values are truncated.
pub fn parse_card_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| finite_to_i64(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| finite_to_i64(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

fn finite_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}
