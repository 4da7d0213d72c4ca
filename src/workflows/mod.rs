//! Request workflows: access check, payload validation, then one atomic store write.
//!
//! The acting [`Principal`] is passed explicitly into every call.

mod catalog;
mod collections;
mod favorites;
mod orders;
mod reviews;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::policy::{self, Action, Identity, Principal, Resource};
use crate::publisher::EventPublisher;
use crate::store::Store;
use crate::{Result, ShopError, NON_FIELD_ERRORS};

pub use catalog::{ProductPatch, ProductPayload};
pub use collections::{CollectionPatch, CollectionPayload, MemberPayload};
pub use favorites::FavoritePayload;
pub use orders::{OrderPatch, OrderPayload, PositionPayload};
pub use reviews::{ReviewPatch, ReviewPayload};

/// Raw partial-update body; field presence matters.
pub type Patch = Map<String, Value>;

#[derive(Clone)]
pub struct Shop {
    store: Arc<dyn Store>,
    events: EventPublisher,
}

impl Shop {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher) -> Self { Self { store, events } }

    /// No token is the anonymous principal; an unknown token is rejected.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Principal> {
        let Some(token) = token else { return Ok(Principal::Anonymous) };
        match self.store.resolve_token(token).await? {
            Some(identity) => Ok(Principal::User(identity)),
            None => {
                tracing::warn!("rejected unknown API token");
                Err(ShopError::Unauthenticated)
            }
        }
    }

    /// Resolves every id to its product, in the given order.
    async fn resolve_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        if ids.is_empty() { return Ok(Vec::new()); }
        let found: HashMap<Uuid, Product> = self.store.get_products(ids).await?
            .into_iter().map(|p| (p.id, p)).collect();
        ids.iter().map(|id| {
            found.get(id).cloned().ok_or_else(|| {
                tracing::warn!(product_id = %id, "payload references unknown product");
                ShopError::NotFound(Resource::Product.noun())
            })
        }).collect()
    }
}

fn guard(resource: Resource, action: Action, principal: &Principal, owner: Option<Uuid>) -> Result<()> {
    policy::authorize(resource, action, principal, owner).map_err(|denied| {
        tracing::debug!(?resource, ?action, ?denied, "access denied");
        ShopError::denied(resource, denied)
    })
}

/// The authenticated identity; call after a guard that requires one.
fn actor(principal: &Principal) -> Result<Identity> {
    principal.identity().copied().ok_or(ShopError::Unauthenticated)
}

/// Rejects a patch naming any field outside `allowed`.
fn ensure_fields(patch: &Patch, allowed: &[&str]) -> Result<()> {
    if patch.keys().all(|key| allowed.contains(&key.as_str())) { return Ok(()); }
    let mut names = allowed.to_vec();
    names.sort_unstable();
    Err(ShopError::invalid("error", format!("allowed fields: {}", names.join(", "))))
}

fn decode<T: DeserializeOwned>(patch: Patch) -> Result<T> {
    serde_json::from_value(Value::Object(patch)).map_err(|e| ShopError::invalid(NON_FIELD_ERRORS, e.to_string()))
}
