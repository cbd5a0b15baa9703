//! Metrics for the sync engine
//!
//! Names follow Prometheus conventions. Recording is a no-op until a recorder
//! is installed with [`init`], so library callers pay nothing by default.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;

/// Every metric name the crate records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Seller API transport
    ApiRequestsSuccess,
    ApiRequestsError,

    // Catalog sync
    CatalogPagesFetched,
    CatalogCardsFetched,
    CatalogCardsDropped,
    CatalogProductsNormalized,

    // Feedback sync
    FeedbackPagesFetched,
    FeedbackItemsFetched,
    FeedbackDuplicatesDropped,

    // Credential store
    StoreFallbacks,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ApiRequestsSuccess => "wb_api_requests_success_total",
            MetricName::ApiRequestsError => "wb_api_requests_error_total",
            MetricName::CatalogPagesFetched => "wb_catalog_pages_fetched_total",
            MetricName::CatalogCardsFetched => "wb_catalog_cards_fetched_total",
            MetricName::CatalogCardsDropped => "wb_catalog_cards_dropped_total",
            MetricName::CatalogProductsNormalized => "wb_catalog_products_normalized_total",
            MetricName::FeedbackPagesFetched => "wb_feedback_pages_fetched_total",
            MetricName::FeedbackItemsFetched => "wb_feedback_items_fetched_total",
            MetricName::FeedbackDuplicatesDropped => "wb_feedback_duplicates_dropped_total",
            MetricName::StoreFallbacks => "wb_store_fallbacks_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the Prometheus recorder. The returned handle renders the current
/// snapshot in text exposition format.
pub fn init() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))
}

pub mod api {
    use super::MetricName;

    pub fn request_succeeded(path: &'static str) {
        ::metrics::counter!(MetricName::ApiRequestsSuccess.as_str(), "path" => path).increment(1);
    }

    pub fn request_failed(path: &'static str) {
        ::metrics::counter!(MetricName::ApiRequestsError.as_str(), "path" => path).increment(1);
    }
}

pub mod catalog {
    use super::MetricName;

    pub fn page_fetched(cards: usize) {
        ::metrics::counter!(MetricName::CatalogPagesFetched.as_str()).increment(1);
        ::metrics::counter!(MetricName::CatalogCardsFetched.as_str()).increment(cards as u64);
    }

    pub fn cards_dropped(count: usize) {
        ::metrics::counter!(MetricName::CatalogCardsDropped.as_str()).increment(count as u64);
    }

    pub fn products_normalized(count: usize) {
        ::metrics::counter!(MetricName::CatalogProductsNormalized.as_str())
            .increment(count as u64);
    }
}

pub mod feedback {
    use super::MetricName;
    use crate::types::FeedbackKind;

    pub fn page_fetched(kind: FeedbackKind, items: usize) {
        ::metrics::counter!(MetricName::FeedbackPagesFetched.as_str(), "kind" => kind.as_str())
            .increment(1);
        ::metrics::counter!(MetricName::FeedbackItemsFetched.as_str(), "kind" => kind.as_str())
            .increment(items as u64);
    }

    pub fn duplicates_dropped(kind: FeedbackKind, count: usize) {
        ::metrics::counter!(MetricName::FeedbackDuplicatesDropped.as_str(), "kind" => kind.as_str())
            .increment(count as u64);
    }
}

pub mod store {
    use super::MetricName;

    pub fn fallback_used(operation: &'static str) {
        ::metrics::counter!(MetricName::StoreFallbacks.as_str(), "op" => operation).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prometheus_counters() {
        let all = [
            MetricName::ApiRequestsSuccess,
            MetricName::ApiRequestsError,
            MetricName::CatalogPagesFetched,
            MetricName::CatalogCardsFetched,
            MetricName::CatalogCardsDropped,
            MetricName::CatalogProductsNormalized,
            MetricName::FeedbackPagesFetched,
            MetricName::FeedbackItemsFetched,
            MetricName::FeedbackDuplicatesDropped,
            MetricName::StoreFallbacks,
        ];
        for name in all {
            assert!(name.as_str().starts_with("wb_"));
            assert!(name.as_str().ends_with("_total"));
            assert_eq!(name.to_string(), name.as_str());
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        catalog::page_fetched(3);
        store::fallback_used("set");
    }
}
