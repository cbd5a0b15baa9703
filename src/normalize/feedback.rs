use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{Result, SellerError};
use crate::normalize::fields::{scalar_text, FEEDBACK_DATES, FEEDBACK_ID};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const BOUND_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
// Epoch numbers at or above this are already milliseconds
const MILLIS_THRESHOLD: f64 = 1e11;

/// Deduplicate, order newest first and cap a merged feedback list.
pub fn rank_feedback(items: Vec<Value>, limit: usize) -> Vec<Value> {
    rank_by_recency(dedupe_by_id(items), limit)
}

/// Items with an id keep their first occurrence (keyed by the id's text
/// form). Items without an id are never deduplicated and follow the others.
pub fn dedupe_by_id(items: Vec<Value>) -> Vec<Value> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut with_id = Vec::with_capacity(items.len());
    let mut without_id = Vec::new();

    for item in items {
        match id_key(&item) {
            Some(key) => {
                if seen.insert(key) {
                    with_id.push(item);
                }
            }
            None => without_id.push(item),
        }
    }

    with_id.extend(without_id);
    with_id
}

/// Stable sort by resolved timestamp, newest first, then truncate.
pub fn rank_by_recency(items: Vec<Value>, limit: usize) -> Vec<Value> {
    let mut keyed: Vec<(i64, Value)> = items
        .into_iter()
        .map(|item| (resolve_timestamp(&item), item))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.truncate(limit);
    keyed.into_iter().map(|(_, item)| item).collect()
}

fn id_key(item: &Value) -> Option<String> {
    match item.get(FEEDBACK_ID)? {
        Value::Null => None,
        scalar @ (Value::String(_) | Value::Number(_) | Value::Bool(_)) => scalar_text(scalar),
        other => Some(other.to_string()),
    }
}

/// Milliseconds since epoch of the first date field that parses to a
/// non-zero instant; 0 when none does.
pub fn resolve_timestamp(item: &Value) -> i64 {
    FEEDBACK_DATES
        .iter()
        .filter_map(|name| item.get(*name))
        .filter_map(parse_timestamp)
        .find(|millis| *millis != 0)
        .unwrap_or(0)
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(epoch_to_millis),
        Value::String(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight).timestamp_millis());
    }
    text.parse::<f64>().ok().and_then(epoch_to_millis)
}

/// Unix seconds for a user-supplied date filter bound.
///
/// Text with a `T` is a timestamp, UTC unless it carries an offset. Anything
/// else names a calendar day in UTC and resolves to its first second, or to
/// its last second when `end_of_day` is set.
pub fn parse_date_bound(value: &str, end_of_day: bool) -> Result<i64> {
    let text = value.trim();
    let invalid = || {
        SellerError::malformed(format!(
            "invalid date {:?}, expected YYYY-MM-DD or an ISO 8601 timestamp",
            value
        ))
    };

    if text.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.timestamp());
        }
        return BOUND_DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(|naive| Utc.from_utc_datetime(&naive).timestamp())
            .ok_or_else(invalid);
    }

    let day = NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, NAIVE_DATETIME_FORMATS[1])
                .ok()
                .map(|naive| naive.date())
        })
        .ok_or_else(invalid)?;
    let bound = if end_of_day {
        day.and_hms_opt(23, 59, 59)
    } else {
        day.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&bound).timestamp())
}

fn epoch_to_millis(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    Some(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(items: &[Value]) -> Vec<Value> {
        items.iter().map(|i| i["id"].clone()).collect()
    }

    #[test]
    fn test_duplicate_keeps_first_and_ranks_newest_first() {
        let items = vec![
            json!({"id": 1, "createdDate": "2024-01-01"}),
            json!({"id": 2, "createdDate": "2024-03-01"}),
            json!({"id": 1, "createdDate": "2024-01-02"}),
        ];
        let ranked = rank_feedback(items, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0]["id"], 2);
        assert_eq!(ranked[1]["id"], 1);
        assert_eq!(ranked[1]["createdDate"], "2024-01-01");
    }

    #[test]
    fn test_ids_compared_by_text_form() {
        let items = vec![json!({"id": "7", "text": "a"}), json!({"id": 7, "text": "b"})];
        let deduped = dedupe_by_id(items);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0]["text"], "a");
    }

    #[test]
    fn test_items_without_id_are_kept_after_identified_ones() {
        let items = vec![
            json!({"text": "anon-1"}),
            json!({"id": 1}),
            json!({"id": null, "text": "anon-2"}),
            json!({"id": 1}),
        ];
        let deduped = dedupe_by_id(items);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0]["id"], 1);
        assert_eq!(deduped[1]["text"], "anon-1");
        assert_eq!(deduped[2]["text"], "anon-2");
    }

    #[test]
    fn test_date_field_priority_and_zero_skipping() {
        let item = json!({"createdDate": "", "createdAt": 0, "updatedDate": "2024-02-01T00:00:00Z", "date": "2025-01-01"});
        assert_eq!(resolve_timestamp(&item), 1_706_745_600_000);
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = 1_704_067_200_000; // 2024-01-01T00:00:00Z
        for value in [
            json!("2024-01-01T00:00:00Z"),
            json!("2024-01-01T03:00:00+03:00"),
            json!("2024-01-01T00:00:00"),
            json!("2024-01-01 00:00:00.000"),
            json!("2024-01-01"),
            json!(1_704_067_200),
            json!(1_704_067_200_000_i64),
            json!("1704067200"),
        ] {
            assert_eq!(resolve_timestamp(&json!({ "date": value })), expected, "{value}");
        }
    }

    #[test]
    fn test_date_bounds() {
        let midnight = 1_704_067_200; // 2024-01-01T00:00:00Z
        assert_eq!(parse_date_bound("2024-01-01", false).unwrap(), midnight);
        assert_eq!(parse_date_bound(" 2024-01-01 ", true).unwrap(), midnight + 86_399);
        assert_eq!(parse_date_bound("2024-01-01 15:30:00", true).unwrap(), midnight + 86_399);
        assert_eq!(parse_date_bound("2024-01-01T10:00:00Z", true).unwrap(), midnight + 36_000);
        assert_eq!(parse_date_bound("2024-01-01T13:00:00+03:00", false).unwrap(), midnight + 36_000);
        assert_eq!(parse_date_bound("2024-01-01T10:00", false).unwrap(), midnight + 36_000);
        assert!(matches!(
            parse_date_bound("yesterday", false),
            Err(SellerError::MalformedInput(_))
        ));
        assert!(parse_date_bound("2024-13-01", false).is_err());
    }

    #[test]
    fn test_unparseable_dates_rank_last_in_merge_order() {
        let items = vec![
            json!({"id": "a", "createdDate": "garbage"}),
            json!({"id": "b"}),
            json!({"id": "c", "createdDate": "2023-06-01"}),
        ];
        let ranked = rank_feedback(items, 10);
        assert_eq!(ids(&ranked), vec![json!("c"), json!("a"), json!("b")]);
    }

    #[test]
    fn test_equal_dates_keep_merge_order_and_limit_applies() {
        let items = vec![
            json!({"id": 1, "date": "2024-01-01"}),
            json!({"id": 2, "date": "2024-01-01"}),
            json!({"id": 3, "date": "2024-01-01"}),
        ];
        let ranked = rank_feedback(items, 2);
        assert_eq!(ids(&ranked), vec![json!(1), json!(2)]);
    }
}
