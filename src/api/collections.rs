use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use uuid::Uuid;

use crate::domain::aggregates::Collection;
use crate::workflows::{CollectionPatch, CollectionPayload};
use crate::ShopError;
use super::{AppState, Caller, Id, Payload};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product-collections", get(list_collections).post(create_collection))
        .route("/product-collections/:id", get(get_collection).put(revise_collection).patch(revise_collection).delete(delete_collection))
}

async fn list_collections(State(s): State<AppState>, Caller(p): Caller) -> Result<Json<Vec<Collection>>, ShopError> {
    s.shop.list_collections(&p).await.map(Json)
}

async fn get_collection(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<Json<Collection>, ShopError> {
    s.shop.get_collection(&p, id).await.map(Json)
}

async fn create_collection(State(s): State<AppState>, Caller(p): Caller, Payload(r): Payload<CollectionPayload>) -> Result<(StatusCode, Json<Collection>), ShopError> {
    Ok((StatusCode::CREATED, Json(s.shop.create_collection(&p, r).await?)))
}

async fn revise_collection(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>, Payload(r): Payload<CollectionPatch>) -> Result<Json<Collection>, ShopError> {
    s.shop.revise_collection(&p, id, r).await.map(Json)
}

async fn delete_collection(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<StatusCode, ShopError> {
    s.shop.delete_collection(&p, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
