//! Catalog workflow: products are read by anyone and written by staff.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::aggregates::{Product, ProductChanges};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::policy::{Action, Principal, Resource};
use crate::domain::value_objects::{Money, MoneyError};
use crate::filters::ProductFilter;
use crate::{Result, ShopError};
use super::{guard, Shop};

fn price_bounds(price: &Decimal) -> std::result::Result<(), ValidationError> {
    let message = match Money::new(*price) {
        Ok(_) => return Ok(()),
        Err(MoneyError::Negative) => "price must not be negative",
        Err(_) => "price must not exceed 9999999999.99",
    };
    let mut error = ValidationError::new("price_bounds");
    error.message = Some(message.into());
    Err(error)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductPayload {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "price_bounds")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "price_bounds")]
    pub price: Option<Decimal>,
}

const PRODUCT: Resource = Resource::Product;

impl Shop {
    pub async fn list_products(&self, principal: &Principal, filter: &ProductFilter) -> Result<Vec<Product>> {
        guard(PRODUCT, Action::Read, principal, None)?;
        Ok(self.store.list_products(filter).await?)
    }

    pub async fn get_product(&self, principal: &Principal, id: Uuid) -> Result<Product> {
        guard(PRODUCT, Action::Read, principal, None)?;
        self.store.get_product(id).await?.ok_or(ShopError::NotFound(PRODUCT.noun()))
    }

    #[tracing::instrument(skip_all)]
    pub async fn create_product(&self, principal: &Principal, payload: ProductPayload) -> Result<Product> {
        guard(PRODUCT, Action::Create, principal, None)?;
        payload.validate()?;
        let product = Product::create(payload.name, payload.description, Money::new(payload.price)?)?;
        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, price = %product.price, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self, principal, patch))]
    pub async fn update_product(&self, principal: &Principal, id: Uuid, patch: ProductPatch) -> Result<Product> {
        guard(PRODUCT, Action::Update, principal, None)?;
        patch.validate()?;
        let mut product = self.store.get_product(id).await?.ok_or(ShopError::NotFound(PRODUCT.noun()))?;
        let price = patch.price.map(Money::new).transpose()?;
        product.apply(ProductChanges { name: patch.name, description: patch.description, price })?;
        if !self.store.update_product(&product).await? { return Err(ShopError::NotFound(PRODUCT.noun())); }
        tracing::info!(product_id = %product.id, price = %product.price, "product updated");
        Ok(product)
    }

    /// Reviews, order lines, collection memberships and favorites of the product go with it.
    pub async fn delete_product(&self, principal: &Principal, id: Uuid) -> Result<()> {
        guard(PRODUCT, Action::Delete, principal, None)?;
        if !self.store.delete_product(id).await? { return Err(ShopError::NotFound(PRODUCT.noun())); }
        tracing::info!(product_id = %id, "product deleted");
        self.events.publish(DomainEvent::Product(ProductEvent::Deleted { product_id: id })).await;
        Ok(())
    }
}
