use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::app::ports::{ApiHost, ApiRequest, SellerApiPort};
use crate::constants::{CARDS_LIST_PATH, MAX_CATALOG_PAGE_SIZE};
use crate::error::{Result, SellerError};
use crate::normalize::catalog::{normalize_products, parse_card_id};
use crate::observability::metrics;
use crate::types::{CatalogOptions, CatalogReport, Credential, Product, RawRecord};

/// Position to resume the card listing from
#[derive(Debug, Clone, PartialEq)]
struct Cursor {
    updated_at: String,
    nm_id: i64,
}

/// Walks the seller's card listing page by page and normalizes the result.
pub struct CatalogUseCase {
    api: Arc<dyn SellerApiPort>,
    locale: String,
}

impl CatalogUseCase {
    pub fn new(api: Arc<dyn SellerApiPort>, locale: impl Into<String>) -> Self {
        Self {
            api,
            locale: locale.into(),
        }
    }

    pub async fn fetch_catalog(
        &self,
        credential: &Credential,
        options: CatalogOptions,
    ) -> Result<Vec<Product>> {
        Ok(self.fetch_catalog_report(credential, options).await?.products)
    }

    #[instrument(skip(self, credential))]
    pub async fn fetch_catalog_report(
        &self,
        credential: &Credential,
        options: CatalogOptions,
    ) -> Result<CatalogReport> {
        let (cards, hit_limit) = self.fetch_raw_cards(credential, options).await?;
        let mut products = normalize_products(&cards);
        products.truncate(options.max_items);

        info!(
            cards = cards.len(),
            products = products.len(),
            hit_limit,
            "Catalog synchronized"
        );
        Ok(CatalogReport {
            products,
            hit_limit,
        })
    }

    /// Raw cards in fetch order, plus whether `max_items` stopped the walk.
    pub async fn fetch_raw_cards(
        &self,
        credential: &Credential,
        options: CatalogOptions,
    ) -> Result<(Vec<RawRecord>, bool)> {
        if options.page_size == 0 {
            return Err(SellerError::malformed("page size must be greater than zero"));
        }
        let page_size = options.page_size.min(MAX_CATALOG_PAGE_SIZE);

        let mut cards: Vec<RawRecord> = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut page = 0usize;

        loop {
            page += 1;
            let payload = self
                .api
                .send(credential, self.page_request(page_size, cursor.as_ref()))
                .await?;

            let batch = payload
                .get("cards")
                .and_then(Value::as_array)
                .ok_or_else(|| SellerError::external(None, "unexpected card list payload: missing cards"))?;
            let batch: Vec<RawRecord> = batch.iter().filter(|c| c.is_object()).cloned().collect();
            let batch_len = batch.len();
            metrics::catalog::page_fetched(batch_len);
            debug!(page, batch_len, "Fetched catalog page");
            cards.extend(batch);

            if cards.len() >= options.max_items {
                cards.truncate(options.max_items);
                return Ok((cards, true));
            }
            if batch_len < page_size {
                break;
            }
            match next_cursor(&payload) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok((cards, false))
    }

    fn page_request(&self, page_size: usize, cursor: Option<&Cursor>) -> ApiRequest {
        let mut cursor_body = Map::new();
        cursor_body.insert("limit".to_string(), json!(page_size));
        if let Some(c) = cursor {
            cursor_body.insert("updatedAt".to_string(), json!(c.updated_at));
            cursor_body.insert("nmID".to_string(), json!(c.nm_id));
        }

        let body = json!({
            "settings": {
                "sort": {"ascending": false},
                "filter": {"withPhoto": -1},
                "cursor": cursor_body,
            }
        });

        let request = ApiRequest::post(ApiHost::Content, CARDS_LIST_PATH, body);
        if self.locale.is_empty() {
            request
        } else {
            request.query("locale", &self.locale)
        }
    }
}

/// Resume point from a page response. A missing cursor, an empty
/// `updatedAt` or a non-positive `nmID` ends the walk.
fn next_cursor(payload: &Value) -> Option<Cursor> {
    let cursor = payload.get("cursor")?.as_object()?;
    let updated_at = match cursor.get("updatedAt")? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let nm_id = cursor.get("nmID").and_then(parse_card_id).filter(|id| *id > 0)?;
    Some(Cursor { updated_at, nm_id })
}
