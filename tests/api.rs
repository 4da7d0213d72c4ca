use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::api::{router, AppState};
use storefront_api::publisher::EventPublisher;
use storefront_api::store::MemoryStore;
use storefront_api::{Identity, Shop};

struct TestApp {
    app: Router,
    staff: String,
    alice: String,
    bob: String,
}

async fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let staff = store.issue_token(Identity { user_id: Uuid::now_v7(), is_staff: true }).await;
    let alice = store.issue_token(Identity { user_id: Uuid::now_v7(), is_staff: false }).await;
    let bob = store.issue_token(Identity { user_id: Uuid::now_v7(), is_staff: false }).await;
    let shop = Shop::new(store, EventPublisher::disabled());
    TestApp { app: router(AppState::new(shop)), staff, alice, bob }
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let t = test_app().await;
    let (status, body) = call(&t.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_staff_product_and_user_order() {
    let t = test_app().await;
    let (status, product) = call(&t.app, Method::POST, "/api/v1/products", Some(&t.staff),
        Some(json!({"name": "kettle", "description": "steel", "price": 100}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["price"], 100.0);

    let (status, order) = call(&t.app, Method::POST, "/api/v1/orders", Some(&t.alice),
        Some(json!({"positions": [{"product_id": product["id"], "amount": 2}]}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["order_sum"], 200.0);
    assert_eq!(order["status"], "NEW");
    assert_eq!(order["positions"][0]["name"], "kettle");

    let uri = format!("/api/v1/orders/{}", order["id"].as_str().unwrap());
    let (status, _) = call(&t.app, Method::GET, &uri, Some(&t.bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&t.app, Method::PATCH, &uri, Some(&t.alice), Some(json!({"status": "DONE"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, revised) = call(&t.app, Method::PATCH, &uri, Some(&t.staff), Some(json!({"status": "DONE"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revised["status"], "DONE");
}

#[tokio::test]
async fn test_product_writes_need_staff() {
    let t = test_app().await;
    let body = json!({"name": "kettle", "price": 10});
    let (status, _) = call(&t.app, Method::POST, "/api/v1/products", Some(&t.alice), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&t.app, Method::POST, "/api/v1/products", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&t.app, Method::POST, "/api/v1/products", Some("not-a-token"), Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, products) = call(&t.app, Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products, json!([]));
}

#[tokio::test]
async fn test_validation_errors_are_keyed_by_field() {
    let t = test_app().await;
    let (status, body) = call(&t.app, Method::POST, "/api/v1/products", Some(&t.staff),
        Some(json!({"name": "kettle", "price": -1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["price"].is_array());
}

#[tokio::test]
async fn test_favorites_of_others_are_not_found() {
    let t = test_app().await;
    let (_, product) = call(&t.app, Method::POST, "/api/v1/products", Some(&t.staff),
        Some(json!({"name": "kettle", "price": 10}))).await;
    let (status, favorite) = call(&t.app, Method::POST, "/api/v1/favorites", Some(&t.alice),
        Some(json!({"product": product["id"]}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/favorites/{}", favorite["id"].as_str().unwrap());
    let (status, _) = call(&t.app, Method::GET, &uri, Some(&t.bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&t.app, Method::DELETE, &uri, Some(&t.bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&t.app, Method::DELETE, &uri, Some(&t.alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

async fn staff_product(t: &TestApp) -> String {
    let (_, product) = call(&t.app, Method::POST, "/api/v1/products", Some(&t.staff),
        Some(json!({"name": "kettle", "price": 10}))).await;
    product["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_malformed_payloads_are_field_keyed_bad_requests() {
    let t = test_app().await;
    let product_id = staff_product(&t).await;

    let (status, body) = call(&t.app, Method::POST, "/api/v1/orders", Some(&t.alice),
        Some(json!({"positions": [{"product_id": "nope", "amount": 1}]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["positions[0].product_id"].is_array());

    let (status, body) = call(&t.app, Method::POST, "/api/v1/orders", Some(&t.alice),
        Some(json!({"positions": [{"product_id": product_id, "amount": "two"}]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["positions[0].amount"].is_array());

    let (status, body) = call(&t.app, Method::POST, "/api/v1/product-collections", Some(&t.staff),
        Some(json!({"products_list": [{"product_id": product_id}]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["title"].is_array());

    let (status, body) = call(&t.app, Method::POST, "/api/v1/favorites", Some(&t.alice), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["product"].is_array());

    let (status, body) = call(&t.app, Method::POST, "/api/v1/product-reviews", Some(&t.alice),
        Some(json!({"product": product_id, "rating": "five"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["rating"].is_array());

    let (status, body) = call(&t.app, Method::GET, "/api/v1/products/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["id"].is_array());
}

#[tokio::test]
async fn test_product_update_and_delete_need_staff() {
    let t = test_app().await;
    let uri = format!("/api/v1/products/{}", staff_product(&t).await);

    let (status, _) = call(&t.app, Method::PATCH, &uri, Some(&t.alice), Some(json!({"price": 1}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&t.app, Method::PUT, &uri, Some(&t.alice), Some(json!({"name": "pot"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&t.app, Method::DELETE, &uri, Some(&t.alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, product) = call(&t.app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["price"], 10.0);
}

#[tokio::test]
async fn test_collection_update_and_delete_need_staff() {
    let t = test_app().await;
    let product_id = staff_product(&t).await;
    let (status, collection) = call(&t.app, Method::POST, "/api/v1/product-collections", Some(&t.staff),
        Some(json!({"title": "kitchen", "products_list": [{"product_id": product_id}]}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/product-collections/{}", collection["id"].as_str().unwrap());

    let (status, _) = call(&t.app, Method::PATCH, &uri, Some(&t.alice), Some(json!({"title": "mine"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&t.app, Method::DELETE, &uri, Some(&t.alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&t.app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, collection) = call(&t.app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collection["title"], "kitchen");
}

#[tokio::test]
async fn test_review_of_another_user_cannot_be_deleted() {
    let t = test_app().await;
    let product_id = staff_product(&t).await;
    let (status, review) = call(&t.app, Method::POST, "/api/v1/product-reviews", Some(&t.alice),
        Some(json!({"product": product_id, "text": "fine", "rating": 4}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/product-reviews/{}", review["id"].as_str().unwrap());

    let (status, _) = call(&t.app, Method::DELETE, &uri, Some(&t.bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&t.app, Method::DELETE, &uri, Some(&t.staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
