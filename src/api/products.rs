use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::filters::ProductFilter;
use crate::workflows::{ProductPatch, ProductPayload};
use crate::ShopError;
use super::{AppState, Caller, Filter, Id, Payload};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product).put(update_product).patch(update_product).delete(delete_product))
}

async fn list_products(State(s): State<AppState>, Caller(p): Caller, Filter(f): Filter<ProductFilter>) -> Result<Json<Vec<Product>>, ShopError> {
    s.shop.list_products(&p, &f).await.map(Json)
}

async fn get_product(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<Json<Product>, ShopError> {
    s.shop.get_product(&p, id).await.map(Json)
}

async fn create_product(State(s): State<AppState>, Caller(p): Caller, Payload(r): Payload<ProductPayload>) -> Result<(StatusCode, Json<Product>), ShopError> {
    Ok((StatusCode::CREATED, Json(s.shop.create_product(&p, r).await?)))
}

async fn update_product(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>, Payload(r): Payload<ProductPatch>) -> Result<Json<Product>, ShopError> {
    s.shop.update_product(&p, id, r).await.map(Json)
}

async fn delete_product(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<StatusCode, ShopError> {
    s.shop.delete_product(&p, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
