use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SellerError};
use crate::normalize::feedback::parse_date_bound;

/// Raw record as returned by the seller API (catalog card or feedback item)
pub type RawRecord = serde_json::Value;

/// A catalog entry after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub vendor_code: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOptions {
    pub page_size: usize,
    pub max_items: usize,
}

/// Normalized catalog plus whether `max_items` cut the walk short
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogReport {
    pub products: Vec<Product>,
    pub hit_limit: bool,
}

/// Ranked feedback plus whether the offset ceiling stopped a partition early
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReport {
    pub items: Vec<RawRecord>,
    pub hit_limit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackKind {
    Reviews,
    Questions,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Reviews => "reviews",
            FeedbackKind::Questions => "questions",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback partitions in the order they are walked and merged.
pub const PARTITIONS: [Partition; 2] = [Partition::Unanswered, Partition::Answered];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Unanswered,
    Answered,
}

impl Partition {
    /// Value of the `isAnswered` query parameter
    pub fn query_value(&self) -> &'static str {
        match self {
            Partition::Unanswered => "false",
            Partition::Answered => "true",
        }
    }
}

/// Which partitions a feedback export reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnsweredFilter {
    Unanswered,
    Answered,
    #[default]
    All,
}

impl AnsweredFilter {
    pub fn partitions(&self) -> &'static [Partition] {
        match self {
            AnsweredFilter::Unanswered => &[Partition::Unanswered],
            AnsweredFilter::Answered => &[Partition::Answered],
            AnsweredFilter::All => &PARTITIONS,
        }
    }
}

impl FromStr for AnsweredFilter {
    type Err = SellerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "false" => Ok(AnsweredFilter::Unanswered),
            "true" => Ok(AnsweredFilter::Answered),
            "all" => Ok(AnsweredFilter::All),
            other => Err(SellerError::malformed(format!(
                "answered filter must be true, false or all, got {:?}",
                other
            ))),
        }
    }
}

/// Query filters applied to every feedback page request.
/// Date bounds are unix seconds, sent as `dateFrom` / `dateTo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub answered: AnsweredFilter,
    pub date_from: Option<i64>,
    pub date_to: Option<i64>,
}

impl FeedbackFilter {
    /// Build a filter from user-supplied date text. `date_from` counts from the
    /// start of its day and `date_to` up to the end of its day.
    pub fn parse(
        answered: AnsweredFilter,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> Result<Self> {
        let filter = FeedbackFilter {
            answered,
            date_from: date_from.map(|v| parse_date_bound(v, false)).transpose()?,
            date_to: date_to.map(|v| parse_date_bound(v, true)).transpose()?,
        };
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(SellerError::malformed("date_from is later than date_to"));
            }
        }
        Ok(filter)
    }
}

// Prefixes users paste along with the token itself
const TOKEN_ASSIGNMENT_NAMES: [&str; 4] = ["WB_API_TOKEN", "B_API_TOKEN", "TOKEN", "API_TOKEN"];

/// Seller API token, sent verbatim as the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Accepts the token the way sellers tend to paste it: quoted, as an
    /// env assignment, or with a `Bearer` prefix.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut token = unquote(raw);

        if let Some((left, right)) = token.split_once('=') {
            let name = left.trim().to_uppercase();
            if TOKEN_ASSIGNMENT_NAMES.contains(&name.as_str()) {
                token = unquote(right);
            }
        }
        if let Some(prefix) = token.get(..7) {
            if prefix.eq_ignore_ascii_case("bearer ") {
                token = token[7..].trim();
            }
        }

        if token.is_empty() {
            return Err(SellerError::malformed("credential is empty"));
        }
        Ok(Credential(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Seller tokens are JWTs: three dot-separated segments, never short.
    pub fn looks_like_seller_token(&self) -> bool {
        self.0.matches('.').count() == 2 && self.0.len() >= 80
    }
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'').trim()
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}
