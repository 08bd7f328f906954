//! Handler tests for the catalog domain
//!
//! These tests verify that HTTP handlers work correctly:
//! - Request deserialization (JSON → Rust structs)
//! - Response serialization (Rust structs → JSON)
//! - HTTP status codes
//! - Error responses

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_catalog::*;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

// Helper to parse JSON response body
async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn test_app() -> (Router, Uuid) {
    let store = InMemoryCatalogStore::new();
    let category_id = store.seed_category("Apparel").await;
    let service = ProductAggregateService::new(store, InMemoryDetailCache::new());
    (handlers::router(service), category_id)
}

fn create_body(category_id: Uuid, name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "category_id": category_id,
        "base_price_cents": 2500,
        "is_published": true,
        "variants": [
            { "sku": "TS-M", "size": "M", "initial_quantity": 10 }
        ]
    })
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn create_product_returns_201() {
    let (app, category_id) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/products",
            &create_body(category_id, "Trail Shirt"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let detail: ProductDetail = json_body(response.into_body()).await;
    assert_eq!(detail.name, "Trail Shirt");
    assert_eq!(detail.slug, "trail-shirt");
    assert_eq!(detail.variants.len(), 1);
    assert_eq!(detail.variants[0].quantity, 10);
}

#[tokio::test]
async fn create_product_validates_input() {
    let (app, category_id) = test_app().await;

    // Empty name fails validation
    let response = app
        .oneshot(post_json("/products", &create_body(category_id, "")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_with_unknown_category_returns_400() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/products",
            &create_body(Uuid::now_v7(), "Trail Shirt"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_product_returns_200() {
    let (app, category_id) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            &create_body(category_id, "Trail Shirt"),
        ))
        .await
        .unwrap();
    let created: ProductDetail = json_body(response.into_body()).await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/products/{}", created.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let detail: ProductDetail = json_body(response.into_body()).await;
    assert_eq!(detail.id, created.id);
}

#[tokio::test]
async fn get_missing_product_returns_404() {
    let (app, _) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/products/{}", Uuid::now_v7()))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_with_malformed_uuid_returns_400() {
    let (app, _) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/products/not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_with_stale_token_returns_409() {
    let (app, category_id) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            &create_body(category_id, "Trail Shirt"),
        ))
        .await
        .unwrap();
    let created: ProductDetail = json_body(response.into_body()).await;

    let body = json!({
        "name": "Renamed",
        "category_id": category_id,
        "base_price_cents": 3000,
        "is_published": true,
        "expected_token": VersionToken::fresh(),
    });
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/products/{}", created.id))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_returns_fresh_detail() {
    let (app, category_id) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            &create_body(category_id, "Trail Shirt"),
        ))
        .await
        .unwrap();
    let created: ProductDetail = json_body(response.into_body()).await;

    let body = json!({
        "name": "Summit Shirt",
        "category_id": category_id,
        "base_price_cents": 3000,
        "is_published": true,
        "expected_token": created.version_token,
    });
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/products/{}", created.id))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let updated: ProductDetail = json_body(response.into_body()).await;
    assert_eq!(updated.name, "Summit Shirt");
    assert_ne!(updated.version_token, created.version_token);
    // Empty variant list in the request leaves the variant set untouched
    assert_eq!(updated.variants.len(), 1);
}

#[tokio::test]
async fn delete_product_returns_204() {
    let (app, category_id) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            &create_body(category_id, "Trail Shirt"),
        ))
        .await
        .unwrap();
    let created: ProductDetail = json_body(response.into_body()).await;

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/products/{}", created.id))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/products/{}", created.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn adjust_inventory_returns_new_level() {
    let (app, category_id) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            &create_body(category_id, "Trail Shirt"),
        ))
        .await
        .unwrap();
    let created: ProductDetail = json_body(response.into_body()).await;
    let variant = &created.variants[0];

    let body = json!({
        "delta": -4,
        "expected_token": variant.inventory_version_token.unwrap(),
    });
    let response = app
        .oneshot(post_json(
            &format!("/variants/{}/adjust-inventory", variant.id),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let level: InventoryLevel = json_body(response.into_body()).await;
    assert_eq!(level.quantity, 6);
    assert_eq!(level.product_id, created.id);
}

#[tokio::test]
async fn zero_delta_returns_400() {
    let (app, category_id) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            &create_body(category_id, "Trail Shirt"),
        ))
        .await
        .unwrap();
    let created: ProductDetail = json_body(response.into_body()).await;
    let variant = &created.variants[0];

    let body = json!({
        "delta": 0,
        "expected_token": variant.inventory_version_token.unwrap(),
    });
    let response = app
        .oneshot(post_json(
            &format!("/variants/{}/adjust-inventory", variant.id),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_products_pages_results() {
    let (app, category_id) = test_app().await;

    for i in 0..3 {
        app.clone()
            .oneshot(post_json(
                "/products",
                &create_body(category_id, &format!("Shirt {}", i)),
            ))
            .await
            .unwrap();
    }

    let request = Request::builder()
        .method("GET")
        .uri("/products?page=1&page_size=2")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let page: Paged<ProductSummary> = json_body(response.into_body()).await;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 2);
}
