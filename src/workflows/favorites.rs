//! Favorites workflow. Every operation is scoped to the caller's own entries.

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::aggregates::Favorite;
use crate::domain::policy::{Action, Principal, Resource};
use crate::{Result, ShopError};
use super::{actor, guard, Shop};

#[derive(Debug, Clone, Deserialize)]
pub struct FavoritePayload { pub product: Uuid }

const FAVORITE: Resource = Resource::Favorite;

impl Shop {
    pub async fn list_favorites(&self, principal: &Principal) -> Result<Vec<Favorite>> {
        guard(FAVORITE, Action::Read, principal, None)?;
        Ok(self.store.list_favorites(actor(principal)?.user_id).await?)
    }

    /// Someone else's favorite is reported as missing.
    pub async fn get_favorite(&self, principal: &Principal, id: Uuid) -> Result<Favorite> {
        guard(FAVORITE, Action::Read, principal, None)?;
        let favorite = self.store.get_favorite(id, actor(principal)?.user_id).await?
            .ok_or(ShopError::NotFound(FAVORITE.noun()))?;
        guard(FAVORITE, Action::Read, principal, Some(favorite.user))?;
        Ok(favorite)
    }

    #[tracing::instrument(skip_all)]
    pub async fn add_favorite(&self, principal: &Principal, payload: FavoritePayload) -> Result<Favorite> {
        guard(FAVORITE, Action::Create, principal, None)?;
        let favorite = Favorite::mark(actor(principal)?.user_id, payload.product);
        self.store.insert_favorite(&favorite).await.inspect_err(|e| tracing::warn!(error = %e, "favorite rejected"))?;
        tracing::info!(favorite_id = %favorite.id, product_id = %favorite.product, "favorite added");
        Ok(favorite)
    }

    pub async fn remove_favorite(&self, principal: &Principal, id: Uuid) -> Result<()> {
        guard(FAVORITE, Action::Delete, principal, None)?;
        if !self.store.delete_favorite(id, actor(principal)?.user_id).await? {
            return Err(ShopError::NotFound(FAVORITE.noun()));
        }
        tracing::info!(favorite_id = %id, "favorite removed");
        Ok(())
    }
}
