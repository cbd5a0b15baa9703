//! Candidate field names for each logical field of a raw seller API record.
//!
//! The seller API is not consistent about naming: the same value shows up
//! under different keys depending on endpoint and API version. Every logical
//! field is resolved from an ordered candidate list, first match wins.

use serde_json::Value;

/// Catalog card identifier
pub const CARD_ID: &[&str] = &["nmID", "nmId"];
pub const CARD_TITLE: &[&str] = &["title", "subjectName"];
pub const CARD_VENDOR_CODE: &[&str] = &["vendorCode"];
/// Modification timestamp used to version photo URLs
pub const CARD_VERSION: &[&str] = &["updatedAt", "updateAt", "modifiedAt", "createdAt"];

/// Photo-bearing collections with their base priority
pub const PHOTO_COLLECTIONS: &[(&str, i32)] = &[("photos", 30), ("mediaFiles", 20), ("images", 10)];
/// Named resolutions inside a photo object, larger score wins
pub const PHOTO_SIZES: &[(&str, i32)] = &[
    ("big", 60),
    ("c516x688", 55),
    ("c246x328", 50),
    ("tm", 45),
    ("url", 40),
];
pub const PHOTO_MAIN_FLAG: &str = "isMain";
/// Flat string fields tried when no collection yields a URL
pub const FLAT_PHOTO: &[&str] = &["photo", "image", "imageUrl"];

/// Date fields of a feedback item in ranking priority order
pub const FEEDBACK_DATES: &[&str] = &["createdDate", "createdAt", "updatedDate", "date"];
pub const FEEDBACK_ID: &str = "id";

/// First candidate present with a non-null value.
pub fn first_present<'a>(record: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|v| !v.is_null())
}

/// First candidate holding a "truthy" value: not null, not false, not zero,
/// not an empty string or container.
pub fn first_truthy<'a>(record: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|v| is_truthy(v))
}

/// First candidate whose text form is non-blank, trimmed.
pub fn first_text(record: &Value, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|name| record.get(*name))
        .filter_map(scalar_text)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Text form of a scalar; containers and null have none.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
