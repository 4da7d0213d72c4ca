use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use uuid::Uuid;

use crate::domain::aggregates::Favorite;
use crate::workflows::FavoritePayload;
use crate::ShopError;
use super::{AppState, Caller, Id, Payload};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/:id", get(get_favorite).delete(remove_favorite))
}

async fn list_favorites(State(s): State<AppState>, Caller(p): Caller) -> Result<Json<Vec<Favorite>>, ShopError> {
    s.shop.list_favorites(&p).await.map(Json)
}

async fn get_favorite(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<Json<Favorite>, ShopError> {
    s.shop.get_favorite(&p, id).await.map(Json)
}

async fn add_favorite(State(s): State<AppState>, Caller(p): Caller, Payload(r): Payload<FavoritePayload>) -> Result<(StatusCode, Json<Favorite>), ShopError> {
    Ok((StatusCode::CREATED, Json(s.shop.add_favorite(&p, r).await?)))
}

async fn remove_favorite(State(s): State<AppState>, Caller(p): Caller, Id(id): Id<Uuid>) -> Result<StatusCode, ShopError> {
    s.shop.remove_favorite(&p, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
