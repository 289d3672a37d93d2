use std::{sync::Arc, time::Duration};

use httpmock::MockServer;
use reqwest::Url;
use serde_json::json;
use vitrine::{
    application::catalog::{CATEGORY_TYPES_PATH, CatalogService, HomeViewModel, PRODUCTS_PATH},
    cache::{CacheConfig, ResponseCache},
    infra::cms::{CmsClient, CmsClientConfig},
};

fn catalog(base_url: &str) -> CatalogService {
    let config = CmsClientConfig {
        base_url: Url::parse(base_url).expect("valid url"),
        read_api_key: String::new(),
        write_api_key: String::new(),
        request_timeout: Duration::from_secs(2),
        probe_path: "/_health".to_string(),
        probe_timeout: Duration::from_secs(1),
    };
    let client = CmsClient::new(
        config,
        Arc::new(ResponseCache::new(&CacheConfig::default())),
    )
    .expect("client should build");
    CatalogService::new(Arc::new(client))
}

fn collection(total: u64) -> serde_json::Value {
    json!({
        "data": [],
        "meta": {"pagination": {"total": total, "page": 1, "pageSize": 1, "pageCount": total}}
    })
}

#[tokio::test]
async fn overview_reports_collection_totals() {
    let server = MockServer::start_async().await;
    let products = server
        .mock_async(|when, then| {
            when.method("GET")
                .path(PRODUCTS_PATH)
                .query_param("filters[publishedAt][$notNull]", "true");
            then.status(200).json_body(collection(25));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET").path(CATEGORY_TYPES_PATH);
            then.status(200).json_body(collection(8));
        })
        .await;

    let catalog = catalog(&server.base_url());
    let expected = HomeViewModel {
        published_products_count: 25,
        category_types_count: 8,
    };
    assert_eq!(catalog.overview().await, expected);

    // Counts are cached, so a second render stays off the network.
    assert_eq!(catalog.overview().await, expected);
    products.assert_calls_async(1).await;
}

#[tokio::test]
async fn overview_falls_back_to_zero_when_cms_is_down() {
    let catalog = catalog("http://127.0.0.1:1");

    assert_eq!(catalog.overview().await, HomeViewModel::default());
}

#[tokio::test]
async fn overview_degrades_per_call() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path(PRODUCTS_PATH);
            then.status(200).json_body(collection(15));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET").path(CATEGORY_TYPES_PATH);
            then.status(500).body("internal error");
        })
        .await;

    let view = catalog(&server.base_url()).overview().await;
    assert_eq!(view.published_products_count, 15);
    assert_eq!(view.category_types_count, 0);
}

#[tokio::test]
async fn overview_treats_missing_pagination_as_zero() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET").path(PRODUCTS_PATH);
            then.status(200).json_body(json!({"data": []}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET").path(CATEGORY_TYPES_PATH);
            then.status(200).json_body(json!({"data": [], "meta": {}}));
        })
        .await;

    assert_eq!(
        catalog(&server.base_url()).overview().await,
        HomeViewModel::default()
    );
}

#[tokio::test]
async fn product_listing_is_fail_soft() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("GET")
                .path(PRODUCTS_PATH)
                .query_param("pagination[page]", "2");
            then.status(200).json_body(json!({
                "data": [{"id": 3, "documentId": "doc-3", "name": "Sofa"}],
                "meta": {"pagination": {"total": 25, "page": 2, "pageSize": 24, "pageCount": 2}}
            }));
        })
        .await;

    let listing = catalog(&server.base_url()).products(2).await;
    assert!(listing.available);
    assert_eq!(listing.page, 2);
    assert_eq!(listing.total, 25);
    assert_eq!(listing.products.len(), 1);
    assert_eq!(listing.products[0].name, "Sofa");

    let offline = catalog("http://127.0.0.1:1").products(0).await;
    assert!(!offline.available);
    assert_eq!(offline.page, 1);
    assert!(offline.products.is_empty());
}
