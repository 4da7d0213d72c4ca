//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Money;

pub const MAX_NAME_LEN: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staff-supplied changes; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
}

impl Product {
    pub fn create(name: impl Into<String>, description: impl Into<String>, price: Money) -> Result<Self, ProductError> {
        let name = name.into();
        check_name(&name)?;
        let now = Utc::now();
        Ok(Self { id: Uuid::now_v7(), name, description: description.into(), price, created_at: now, updated_at: now })
    }

    /// `updated_at` keeps its creation stamp.
    pub fn apply(&mut self, changes: ProductChanges) -> Result<(), ProductError> {
        if let Some(name) = changes.name {
            check_name(&name)?;
            self.name = name;
        }
        if let Some(description) = changes.description { self.description = description; }
        if let Some(price) = changes.price { self.price = price; }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), ProductError> {
    if name.trim().is_empty() { return Err(ProductError::MissingName); }
    if name.chars().count() > MAX_NAME_LEN { return Err(ProductError::NameTooLong); }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("name must not be blank")]
    MissingName,
    #[error("name must be at most 100 characters")]
    NameTooLong,
}
