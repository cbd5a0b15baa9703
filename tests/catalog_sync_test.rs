mod support;

use serde_json::{json, Value};

use support::{credential, ScriptedSellerApi};
use wb_seller_export::app::ports::{ApiHost, ApiMethod};
use wb_seller_export::app::CatalogUseCase;
use wb_seller_export::error::SellerError;
use wb_seller_export::types::CatalogOptions;

fn card(id: i64, title: &str) -> Value {
    json!({"nmID": id, "title": title, "vendorCode": format!("VC-{id}")})
}

fn cursor_nm_id(body: &Option<Value>) -> Option<i64> {
    body.as_ref()?["settings"]["cursor"]["nmID"].as_i64()
}

#[tokio::test]
async fn test_cursor_walk_until_short_page() {
    let api = ScriptedSellerApi::new(|request| {
        Ok(match cursor_nm_id(&request.body) {
            None => json!({
                "cards": [card(3, "charlie"), card(1, "Alpha")],
                "cursor": {"updatedAt": "2024-05-01T10:00:00Z", "nmID": 1, "total": 2}
            }),
            Some(1) => json!({
                "cards": [card(2, "bravo")],
                "cursor": {"updatedAt": "2024-04-01T10:00:00Z", "nmID": 2, "total": 1}
            }),
            Some(other) => panic!("unexpected cursor {other}"),
        })
    });
    let use_case = CatalogUseCase::new(api.clone(), "ru");

    let report = use_case
        .fetch_catalog_report(&credential(), CatalogOptions { page_size: 2, max_items: 100 })
        .await
        .unwrap();

    assert!(!report.hit_limit);
    let titles: Vec<&str> = report.products.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "bravo", "charlie"]);

    let requests = api.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, ApiMethod::Post);
    assert_eq!(requests[0].host, ApiHost::Content);
    assert_eq!(requests[0].path, "/content/v2/get/cards/list");
    assert_eq!(requests[0].query_param("locale"), Some("ru"));
    assert_eq!(
        requests[0].body,
        Some(json!({
            "settings": {
                "sort": {"ascending": false},
                "filter": {"withPhoto": -1},
                "cursor": {"limit": 2}
            }
        }))
    );
    let second_cursor = &requests[1].body.as_ref().unwrap()["settings"]["cursor"];
    assert_eq!(
        second_cursor,
        &json!({"limit": 2, "updatedAt": "2024-05-01T10:00:00Z", "nmID": 1})
    );
}

#[tokio::test]
async fn test_max_items_truncates_and_flags_limit() {
    let api = ScriptedSellerApi::new(|request| {
        let base = cursor_nm_id(&request.body).unwrap_or(0);
        Ok(json!({
            "cards": [card(base + 1, "a"), card(base + 2, "b")],
            "cursor": {"updatedAt": "2024-05-01", "nmID": base + 2}
        }))
    });
    let use_case = CatalogUseCase::new(api.clone(), "ru");

    let report = use_case
        .fetch_catalog_report(&credential(), CatalogOptions { page_size: 2, max_items: 3 })
        .await
        .unwrap();

    assert!(report.hit_limit);
    assert_eq!(report.products.len(), 3);
    assert_eq!(api.requests().len(), 2);
}

#[tokio::test]
async fn test_full_page_without_cursor_stops() {
    let api = ScriptedSellerApi::new(|_| Ok(json!({"cards": [card(1, "a"), card(2, "b")]})));
    let products = CatalogUseCase::new(api.clone(), "")
        .fetch_catalog(&credential(), CatalogOptions { page_size: 2, max_items: 100 })
        .await
        .unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(api.requests().len(), 1);
    assert_eq!(api.requests()[0].query_param("locale"), None);
}

#[tokio::test]
async fn test_page_size_is_clamped_and_zero_rejected() {
    let api = ScriptedSellerApi::new(|_| Ok(json!({"cards": []})));
    let use_case = CatalogUseCase::new(api.clone(), "ru");

    use_case
        .fetch_catalog(&credential(), CatalogOptions { page_size: 500, max_items: 100 })
        .await
        .unwrap();
    let body = api.requests()[0].body.clone().unwrap();
    assert_eq!(body["settings"]["cursor"]["limit"], 100);

    let err = use_case
        .fetch_catalog(&credential(), CatalogOptions { page_size: 0, max_items: 100 })
        .await
        .unwrap_err();
    assert!(matches!(err, SellerError::MalformedInput(_)));
    assert_eq!(api.requests().len(), 1);
}

#[tokio::test]
async fn test_duplicates_across_pages_keep_first_card() {
    let api = ScriptedSellerApi::new(|request| {
        Ok(match cursor_nm_id(&request.body) {
            None => json!({
                "cards": [card(7, "First copy"), card(8, "Other")],
                "cursor": {"updatedAt": "2024-05-01", "nmID": 8}
            }),
            Some(_) => json!({"cards": [card(7, "Second copy"), {"title": "no id"}, "garbage"]}),
        })
    });
    let products = CatalogUseCase::new(api, "ru")
        .fetch_catalog(&credential(), CatalogOptions { page_size: 2, max_items: 100 })
        .await
        .unwrap();

    assert_eq!(products.len(), 2);
    let seven = products.iter().find(|p| p.id == 7).unwrap();
    assert_eq!(seven.title, "First copy");
}

#[tokio::test]
async fn test_page_failure_aborts_whole_fetch() {
    let api = ScriptedSellerApi::new(|request| match cursor_nm_id(&request.body) {
        None => Ok(json!({
            "cards": [card(1, "a")],
            "cursor": {"updatedAt": "2024-05-01", "nmID": 1}
        })),
        Some(_) => Err(SellerError::external(Some(429), "Seller API returned 429: too many requests")),
    });
    let err = CatalogUseCase::new(api, "ru")
        .fetch_catalog(&credential(), CatalogOptions { page_size: 1, max_items: 100 })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn test_missing_cards_is_external_error() {
    let api = ScriptedSellerApi::new(|_| Ok(json!({"data": []})));
    let err = CatalogUseCase::new(api, "ru")
        .fetch_catalog(&credential(), CatalogOptions { page_size: 10, max_items: 100 })
        .await
        .unwrap_err();

    assert!(matches!(err, SellerError::ExternalApi { status: None, .. }));
}
