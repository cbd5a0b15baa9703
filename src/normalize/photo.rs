use serde_json::Value;
use url::{form_urlencoded, Url};

use crate::constants::PHOTO_VERSION_PARAM;
use crate::normalize::fields::{
    first_truthy, scalar_text, CARD_VERSION, FLAT_PHOTO, PHOTO_COLLECTIONS, PHOTO_MAIN_FLAG,
    PHOTO_SIZES,
};

/// Ranking of one photo candidate: collection priority, main flag,
/// resolution score, then earlier index (negated so larger is better).
type PhotoScore = (i32, i32, i32, i64);

/// Pick the representative photo for a card and version it with the card's
/// modification timestamp.
pub fn select_photo_url(card: &Value) -> Option<String> {
    let url = best_collection_photo(card).or_else(|| flat_photo(card))?;
    Some(with_version(url, card))
}

fn best_collection_photo(card: &Value) -> Option<&str> {
    let mut best: Option<(PhotoScore, &str)> = None;

    for (collection, base) in PHOTO_COLLECTIONS {
        let Some(items) = card.get(*collection).and_then(Value::as_array) else {
            continue;
        };
        for (idx, item) in items.iter().enumerate() {
            for (score, url) in item_candidates(item, *base, idx as i64) {
                // Strictly greater: the first candidate keeps an exact tie
                if best.map_or(true, |(current, _)| score > current) {
                    best = Some((score, url));
                }
            }
        }
    }

    best.map(|(_, url)| url)
}

fn item_candidates(item: &Value, base: i32, idx: i64) -> Vec<(PhotoScore, &str)> {
    match item {
        Value::String(url) if is_http(url) => vec![((base, 0, 0, -idx), url.as_str())],
        Value::Object(obj) => {
            let is_main = i32::from(obj.get(PHOTO_MAIN_FLAG) == Some(&Value::Bool(true)));
            PHOTO_SIZES
                .iter()
                .filter_map(|(key, key_score)| {
                    obj.get(*key)
                        .and_then(Value::as_str)
                        .filter(|url| is_http(url))
                        .map(|url| ((base, is_main, *key_score, -idx), url))
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

fn flat_photo(card: &Value) -> Option<&str> {
    FLAT_PHOTO
        .iter()
        .filter_map(|key| card.get(*key).and_then(Value::as_str))
        .find(|url| is_http(url))
}

fn is_http(url: &str) -> bool {
    url.starts_with("http")
}

/// Append the card version as a cache-busting query parameter, replacing any
/// existing one. URLs the parser rejects get the parameter appended as text.
pub fn with_version(url: &str, card: &Value) -> String {
    let version = first_truthy(card, CARD_VERSION)
        .and_then(scalar_text)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let Some(version) = version else {
        return url.to_string();
    };

    let Ok(mut parsed) = Url::parse(url) else {
        return append_version_text(url, &version);
    };
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != PHOTO_VERSION_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(PHOTO_VERSION_PARAM, &version);
    parsed.to_string()
}

fn append_version_text(url: &str, version: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = match base.chars().last() {
        _ if !base.contains('?') => "?",
        Some('?') | Some('&') => "",
        _ => "&",
    };
    let encoded: String = form_urlencoded::byte_serialize(version.as_bytes()).collect();
    let mut out = format!("{base}{separator}{PHOTO_VERSION_PARAM}={encoded}");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
