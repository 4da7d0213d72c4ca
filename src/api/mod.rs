//! HTTP surface: one axum router per resource, mounted under `/api/v1`.

mod auth;
mod collections;
mod error;
mod extract;
mod favorites;
mod orders;
mod products;
mod reviews;

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::workflows::Shop;

pub use auth::Caller;
pub use extract::{Filter, Id, Payload};

pub const SERVICE_NAME: &str = "storefront-api";

#[derive(Clone)]
pub struct AppState { pub shop: Shop }

impl AppState {
    pub fn new(shop: Shop) -> Self { Self { shop } }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(products::routes())
        .merge(reviews::routes())
        .merge(orders::routes())
        .merge(collections::routes())
        .merge(favorites::routes());

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": SERVICE_NAME})) }))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
