//! Review workflow.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::review::EDITABLE_FIELDS;
use crate::domain::aggregates::ProductReview;
use crate::domain::policy::{Action, Principal, Resource};
use crate::filters::ReviewFilter;
use crate::{Result, ShopError};
use super::{actor, decode, ensure_fields, guard, Patch, Shop};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewPayload {
    pub product: Uuid,
    #[serde(default)]
    pub text: String,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i16,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReviewPatch {
    pub text: Option<String>,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: Option<i16>,
}

const REVIEW: Resource = Resource::Review;

impl Shop {
    pub async fn list_reviews(&self, principal: &Principal, filter: &ReviewFilter) -> Result<Vec<ProductReview>> {
        guard(REVIEW, Action::Read, principal, None)?;
        Ok(self.store.list_reviews(filter).await?)
    }

    pub async fn get_review(&self, principal: &Principal, id: Uuid) -> Result<ProductReview> {
        guard(REVIEW, Action::Read, principal, None)?;
        self.store.get_review(id).await?.ok_or(ShopError::NotFound(REVIEW.noun()))
    }

    /// The author is always the caller; a second review of the same product is rejected.
    #[tracing::instrument(skip_all)]
    pub async fn create_review(&self, principal: &Principal, payload: ReviewPayload) -> Result<ProductReview> {
        guard(REVIEW, Action::Create, principal, None)?;
        let identity = actor(principal)?;
        payload.validate()?;
        let review = ProductReview::write(identity.user_id, payload.product, payload.text, payload.rating)?;
        self.store.insert_review(&review).await.inspect_err(|e| tracing::warn!(error = %e, "review rejected"))?;
        tracing::info!(review_id = %review.id, product_id = %review.product, "review created");
        Ok(review)
    }

    #[tracing::instrument(skip(self, principal, patch))]
    pub async fn edit_review(&self, principal: &Principal, id: Uuid, patch: Patch) -> Result<ProductReview> {
        let mut review = self.owned_review(principal, Action::Update, id).await?;
        ensure_fields(&patch, &EDITABLE_FIELDS)?;
        let payload: ReviewPatch = decode(patch)?;
        payload.validate()?;
        review.edit(payload.text, payload.rating)?;
        if !self.store.update_review(&review).await? { return Err(ShopError::NotFound(REVIEW.noun())); }
        tracing::info!(review_id = %review.id, "review edited");
        Ok(review)
    }

    pub async fn delete_review(&self, principal: &Principal, id: Uuid) -> Result<()> {
        self.owned_review(principal, Action::Delete, id).await?;
        if !self.store.delete_review(id).await? { return Err(ShopError::NotFound(REVIEW.noun())); }
        tracing::info!(review_id = %id, "review deleted");
        Ok(())
    }

    /// Loads a review the caller may change: its author or staff.
    async fn owned_review(&self, principal: &Principal, action: Action, id: Uuid) -> Result<ProductReview> {
        guard(REVIEW, action, principal, None)?;
        let review = self.store.get_review(id).await?.ok_or(ShopError::NotFound(REVIEW.noun()))?;
        guard(REVIEW, action, principal, Some(review.user))?;
        Ok(review)
    }
}
