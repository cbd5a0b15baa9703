use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::app::ports::{ApiHost, ApiRequest, SellerApiPort};
use crate::config::FeedbackConfig;
use crate::constants::{
    FEEDBACKS_ITEM_KEY, FEEDBACKS_PATH, ORDER_NEWEST_FIRST, QUESTIONS_ITEM_KEY, QUESTIONS_PATH,
};
use crate::error::{Result, SellerError};
use crate::normalize::feedback::{dedupe_by_id, rank_by_recency};
use crate::observability::metrics;
use crate::types::{Credential, FeedbackFilter, FeedbackKind, FeedbackReport, Partition, RawRecord};

/// Added to every fetched item so exports show which partition it came from
pub const ANSWERED_TAG_KEY: &str = "_query_is_answered";

/// Fetches the feedback partitions of a product and merges them into one
/// deduplicated list ordered newest first.
pub struct FeedbackUseCase {
    api: Arc<dyn SellerApiPort>,
    limits: FeedbackConfig,
    filter: FeedbackFilter,
}

impl FeedbackUseCase {
    pub fn new(api: Arc<dyn SellerApiPort>, limits: FeedbackConfig) -> Self {
        Self {
            api,
            limits,
            filter: FeedbackFilter::default(),
        }
    }

    /// Restrict fetches to some partitions and/or a date range.
    pub fn with_filter(mut self, filter: FeedbackFilter) -> Self {
        self.filter = filter;
        self
    }

    pub async fn fetch_latest_reviews(
        &self,
        credential: &Credential,
        product_id: i64,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        Ok(self.fetch_reviews_report(credential, product_id, limit).await?.items)
    }

    pub async fn fetch_all_questions(
        &self,
        credential: &Credential,
        product_id: i64,
        limit: usize,
    ) -> Result<Vec<RawRecord>> {
        Ok(self.fetch_questions_report(credential, product_id, limit).await?.items)
    }

    /// One page per selected partition; with both selected they are
    /// requested concurrently.
    #[instrument(skip(self, credential))]
    pub async fn fetch_reviews_report(
        &self,
        credential: &Credential,
        product_id: i64,
        limit: usize,
    ) -> Result<FeedbackReport> {
        ensure_product_id(product_id)?;
        let take = limit.max(1).min(self.limits.reviews_partition_cap);

        let merged = match self.filter.answered.partitions() {
            [first, second] => {
                let (mut merged, answered) = tokio::try_join!(
                    self.fetch_page(credential, FeedbackKind::Reviews, *first, product_id, take, 0),
                    self.fetch_page(credential, FeedbackKind::Reviews, *second, product_id, take, 0),
                )?;
                merged.extend(answered);
                merged
            }
            partitions => {
                let mut merged = Vec::new();
                for partition in partitions {
                    merged.extend(
                        self.fetch_page(credential, FeedbackKind::Reviews, *partition, product_id, take, 0)
                            .await?,
                    );
                }
                merged
            }
        };

        let items = self.finish(FeedbackKind::Reviews, merged, limit);
        Ok(FeedbackReport {
            items,
            hit_limit: false,
        })
    }

    /// Walks each partition with growing offsets until a short page, the
    /// overall item limit or the offset ceiling stops it.
    #[instrument(skip(self, credential))]
    pub async fn fetch_questions_report(
        &self,
        credential: &Credential,
        product_id: i64,
        limit: usize,
    ) -> Result<FeedbackReport> {
        ensure_product_id(product_id)?;
        let take = self.limits.questions_page_size.max(1);
        let mut merged: Vec<RawRecord> = Vec::new();
        let mut hit_limit = false;

        'partitions: for &partition in self.filter.answered.partitions() {
            let mut skip = 0usize;
            loop {
                if merged.len() >= limit {
                    break 'partitions;
                }
                let batch = self
                    .fetch_page(credential, FeedbackKind::Questions, partition, product_id, take, skip)
                    .await?;
                let batch_len = batch.len();
                merged.extend(batch);
                skip += batch_len;

                if batch_len < take {
                    break;
                }
                if skip > self.limits.questions_offset_ceiling {
                    debug!(?partition, skip, "Offset ceiling reached");
                    hit_limit = true;
                    break;
                }
            }
        }

        let items = self.finish(FeedbackKind::Questions, merged, limit);
        Ok(FeedbackReport { items, hit_limit })
    }

    /// One-item request telling whether the credential may read feedback at all.
    pub async fn check_access(&self, credential: &Credential) -> Result<()> {
        let request = ApiRequest::get(ApiHost::Feedback, QUESTIONS_PATH)
            .query("isAnswered", Partition::Unanswered.query_value())
            .query("take", 1)
            .query("skip", 0)
            .query("order", ORDER_NEWEST_FIRST);
        self.api.send(credential, request).await?;
        Ok(())
    }

    async fn fetch_page(
        &self,
        credential: &Credential,
        kind: FeedbackKind,
        partition: Partition,
        product_id: i64,
        take: usize,
        skip: usize,
    ) -> Result<Vec<RawRecord>> {
        let (path, item_key) = match kind {
            FeedbackKind::Reviews => (FEEDBACKS_PATH, FEEDBACKS_ITEM_KEY),
            FeedbackKind::Questions => (QUESTIONS_PATH, QUESTIONS_ITEM_KEY),
        };
        let mut request = ApiRequest::get(ApiHost::Feedback, path)
            .query("isAnswered", partition.query_value())
            .query("take", take)
            .query("skip", skip)
            .query("order", ORDER_NEWEST_FIRST)
            .query("nmId", product_id);
        if let Some(from) = self.filter.date_from {
            request = request.query("dateFrom", from);
        }
        if let Some(to) = self.filter.date_to {
            request = request.query("dateTo", to);
        }

        let payload = self.api.send(credential, request).await?;
        let mut items = extract_items(&payload, item_key);
        let answered = Value::Bool(partition == Partition::Answered);
        for item in &mut items {
            if let Value::Object(fields) = item {
                fields.insert(ANSWERED_TAG_KEY.to_string(), answered.clone());
            }
        }
        metrics::feedback::page_fetched(kind, items.len());
        debug!(%kind, ?partition, skip, fetched = items.len(), "Fetched feedback page");
        Ok(items)
    }

    fn finish(&self, kind: FeedbackKind, merged: Vec<RawRecord>, limit: usize) -> Vec<RawRecord> {
        let fetched = merged.len();
        let unique = dedupe_by_id(merged);
        let duplicates = fetched - unique.len();
        if duplicates > 0 {
            metrics::feedback::duplicates_dropped(kind, duplicates);
        }
        let items = rank_by_recency(unique, limit);
        info!(%kind, fetched, duplicates, returned = items.len(), "Feedback synchronized");
        items
    }
}

fn ensure_product_id(product_id: i64) -> Result<()> {
    if product_id <= 0 {
        return Err(SellerError::malformed(format!(
            "product id must be positive, got {}",
            product_id
        )));
    }
    Ok(())
}

/// Items live under `data.<item_key>`, or `data` is the list itself.
/// Non-object entries are skipped.
pub fn extract_items(payload: &Value, item_key: &str) -> Vec<RawRecord> {
    let list = match payload.get("data") {
        Some(Value::Object(data)) => data.get(item_key).and_then(Value::as_array),
        Some(Value::Array(items)) => Some(items),
        _ => None,
    };
    list.map(|items| items.iter().filter(|i| i.is_object()).cloned().collect())
        .unwrap_or_default()
}
