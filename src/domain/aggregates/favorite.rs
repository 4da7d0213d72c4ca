//! Favorite Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Favorite {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user: Uuid,
    pub product: Uuid,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

impl Favorite {
    pub fn mark(user: Uuid, product: Uuid) -> Self {
        Self { id: Uuid::now_v7(), user, product, created_at: Utc::now() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FavoriteError {
    #[error("this product is already in favorites")]
    AlreadyFavorited,
}
