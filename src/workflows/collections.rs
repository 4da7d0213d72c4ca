//! Collection aggregate workflow.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::collection;
use crate::domain::aggregates::Collection;
use crate::domain::events::{CollectionEvent, DomainEvent};
use crate::domain::policy::{Action, Principal, Resource};
use crate::store::CollectionRevision;
use crate::{Result, ShopError};
use super::{guard, Shop};

#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload { pub product_id: Uuid }

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CollectionPayload {
    #[validate(length(min = 1, max = 100, message = "title must be 1 to 100 characters"))]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub products_list: Vec<MemberPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CollectionPatch {
    #[validate(length(min = 1, max = 100, message = "title must be 1 to 100 characters"))]
    pub title: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub products_list: Vec<MemberPayload>,
}

const COLLECTION: Resource = Resource::Collection;

impl Shop {
    pub async fn list_collections(&self, principal: &Principal) -> Result<Vec<Collection>> {
        guard(COLLECTION, Action::Read, principal, None)?;
        Ok(self.store.list_collections().await?)
    }

    pub async fn get_collection(&self, principal: &Principal, id: Uuid) -> Result<Collection> {
        guard(COLLECTION, Action::Read, principal, None)?;
        self.store.get_collection(id).await?.ok_or(ShopError::NotFound(COLLECTION.noun()))
    }

    #[tracing::instrument(skip_all)]
    pub async fn create_collection(&self, principal: &Principal, payload: CollectionPayload) -> Result<Collection> {
        guard(COLLECTION, Action::Create, principal, None)?;
        payload.validate()?;
        let ids: Vec<Uuid> = payload.products_list.iter().map(|m| m.product_id).collect();
        collection::ensure_members(&ids).inspect_err(|e| tracing::warn!(error = %e, "collection rejected"))?;
        let products = self.resolve_products(&ids).await?;
        let collection = Collection::create(payload.title, payload.text, &products)?;
        self.store.insert_collection(&collection).await?;
        tracing::info!(collection_id = %collection.id, members = collection.products_list.len(), "collection created");
        self.events.publish(DomainEvent::Collection(CollectionEvent::Created {
            collection_id: collection.id, members: collection.products_list.len(),
        })).await;
        Ok(collection)
    }

    /// Title and text are replaced when given; supplied products that are not
    /// members yet are attached, nothing is ever detached.
    #[tracing::instrument(skip(self, principal, patch))]
    pub async fn revise_collection(&self, principal: &Principal, id: Uuid, patch: CollectionPatch) -> Result<Collection> {
        guard(COLLECTION, Action::Update, principal, None)?;
        patch.validate()?;
        let mut current = self.store.get_collection(id).await?.ok_or(ShopError::NotFound(COLLECTION.noun()))?;
        current.retitle(patch.title.clone(), patch.text.clone())?;
        let supplied: Vec<Uuid> = patch.products_list.iter().map(|m| m.product_id).collect();
        let add_products = current.missing_members(&supplied);
        self.resolve_products(&add_products).await?;
        let added = add_products.len();
        let revision = CollectionRevision { title: patch.title, text: patch.text, add_products };
        let collection = self.store.revise_collection(id, &revision).await?.ok_or(ShopError::NotFound(COLLECTION.noun()))?;
        tracing::info!(collection_id = %collection.id, added, "collection revised");
        self.events.publish(DomainEvent::Collection(CollectionEvent::Revised { collection_id: collection.id, added })).await;
        Ok(collection)
    }

    pub async fn delete_collection(&self, principal: &Principal, id: Uuid) -> Result<()> {
        guard(COLLECTION, Action::Delete, principal, None)?;
        if !self.store.delete_collection(id).await? { return Err(ShopError::NotFound(COLLECTION.noun())); }
        tracing::info!(collection_id = %id, "collection deleted");
        Ok(())
    }
}
