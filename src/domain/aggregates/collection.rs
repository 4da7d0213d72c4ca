//! Collection Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Money;

pub const MAX_TITLE_LEN: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub products_list: Vec<Member>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member { pub product_id: Uuid, pub name: String, pub price: Money }

impl From<&Product> for Member {
    fn from(p: &Product) -> Self { Self { product_id: p.id, name: p.name.clone(), price: p.price } }
}

/// Rejects an empty member list and repeated products.
pub fn ensure_members(product_ids: &[Uuid]) -> Result<(), CollectionError> {
    if product_ids.is_empty() { return Err(CollectionError::NoProducts); }
    let distinct: HashSet<&Uuid> = product_ids.iter().collect();
    if distinct.len() != product_ids.len() { return Err(CollectionError::DuplicateProducts); }
    Ok(())
}

impl Collection {
    pub fn create(title: impl Into<String>, text: impl Into<String>, products: &[Product]) -> Result<Self, CollectionError> {
        let title = title.into();
        check_title(&title)?;
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        ensure_members(&ids)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), title, text: text.into(),
            products_list: products.iter().map(Member::from).collect(),
            created_at: now, updated_at: now,
        })
    }

    pub fn contains(&self, product_id: Uuid) -> bool { self.products_list.iter().any(|m| m.product_id == product_id) }

    /// Supplied ids not yet in the collection, first occurrence order, repeats dropped.
    pub fn missing_members(&self, supplied: &[Uuid]) -> Vec<Uuid> {
        let mut seen: HashSet<Uuid> = self.products_list.iter().map(|m| m.product_id).collect();
        supplied.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    pub fn retitle(&mut self, title: Option<String>, text: Option<String>) -> Result<(), CollectionError> {
        if let Some(title) = title {
            check_title(&title)?;
            self.title = title;
        }
        if let Some(text) = text { self.text = text; }
        Ok(())
    }

    /// Adds products that are not members yet; never removes.
    pub fn add_members(&mut self, products: &[Product]) {
        for product in products {
            if !self.contains(product.id) { self.products_list.push(Member::from(product)); }
        }
    }
}

fn check_title(title: &str) -> Result<(), CollectionError> {
    if title.trim().is_empty() { return Err(CollectionError::MissingTitle); }
    if title.chars().count() > MAX_TITLE_LEN { return Err(CollectionError::TitleTooLong); }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("no products given")]
    NoProducts,
    #[error("collection contains duplicate products")]
    DuplicateProducts,
    #[error("title must not be blank")]
    MissingTitle,
    #[error("title must be at most 100 characters")]
    TitleTooLong,
}
