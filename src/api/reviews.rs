use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use uuid::Uuid;

use crate::domain::aggregates::ProductReview;
use crate::filters::ReviewFilter;
use crate::workflows::{Patch, ReviewPayload};
use crate::ShopError;
use super::{AppState, Caller, Filter, Id, Payload};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product-reviews", get(list_reviews).post(create_review))
        .route("/product-reviews/:id", get(get_review).put(edit_review).patch(edit_review).delete(delete_review))
}

async fn list_reviews(State(s): State<AppState>, Caller(p): Caller, Filter(f): Filter<ReviewFilter>) -> Result<Json<Vec<ProductReview>>, ShopError> {
    s.shop.list_reviews(&p, &f).await.map(Json)
}

async fn get_review(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<Json<ProductReview>, ShopError> {
    s.shop.get_review(&p, id).await.map(Json)
}

async fn create_review(State(s): State<AppState>, Caller(p): Caller, Payload(r): Payload<ReviewPayload>) -> Result<(StatusCode, Json<ProductReview>), ShopError> {
    Ok((StatusCode::CREATED, Json(s.shop.create_review(&p, r).await?)))
}

async fn edit_review(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>, Payload(patch): Payload<Patch>) -> Result<Json<ProductReview>, ShopError> {
    s.shop.edit_review(&p, id, patch).await.map(Json)
}

async fn delete_review(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<StatusCode, ShopError> {
    s.shop.delete_review(&p, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
