use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::filters::OrderFilter;
use crate::workflows::{OrderPayload, Patch};
use crate::ShopError;
use super::{AppState, Caller, Filter, Id, Payload};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/:id", get(get_order).put(revise_order).patch(revise_order).delete(delete_order))
}

async fn list_orders(State(s): State<AppState>, Caller(p): Caller, Filter(f): Filter<OrderFilter>) -> Result<Json<Vec<Order>>, ShopError> {
    s.shop.list_orders(&p, &f).await.map(Json)
}

async fn get_order(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<Json<Order>, ShopError> {
    s.shop.get_order(&p, id).await.map(Json)
}

async fn place_order(State(s): State<AppState>, Caller(p): Caller, Payload(r): Payload<OrderPayload>) -> Result<(StatusCode, Json<Order>), ShopError> {
    Ok((StatusCode::CREATED, Json(s.shop.place_order(&p, r).await?)))
}

async fn revise_order(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>, Payload(patch): Payload<Patch>) -> Result<Json<Order>, ShopError> {
    s.shop.revise_order(&p, id, patch).await.map(Json)
}

async fn delete_order(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<StatusCode, ShopError> {
    s.shop.delete_order(&p, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
