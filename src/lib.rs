//! Storefront API
//!
//! Catalog, reviews, orders, curated collections and favorites served as a
//! REST API over a relational store.
//!
//! ## Features
//! - Product catalog with staff-only writes
//! - One review per user and product
//! - Orders priced from current product prices on every write
//! - Collections that only ever gain members
//! - Per-user favorites invisible to everyone else

pub mod api;
pub mod config;
pub mod domain;
pub mod filters;
pub mod publisher;
pub mod store;
pub mod workflows;

use std::collections::BTreeMap;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::domain::aggregates::{CollectionError, FavoriteError, OrderError, ProductError, ReviewError};
use crate::domain::policy::{Denied, Resource};
use crate::domain::value_objects::MoneyError;
use crate::store::StoreError;

pub use crate::domain::policy::{Identity, Principal};
pub use crate::workflows::Shop;

// =============================================================================
// Error Types
// =============================================================================

/// Messages keyed by the offending payload field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Key used for errors that concern the payload as a whole.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("invalid payload: {0:?}")]
    Validation(FieldErrors),

    #[error("authentication credentials were not provided or are invalid")]
    Unauthenticated,

    #[error("you do not have permission to perform this action")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(StoreError),
}

pub type Result<T> = std::result::Result<T, ShopError>;

impl ShopError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(BTreeMap::from([(field.to_string(), vec![message.into()])]))
    }

    pub fn denied(resource: Resource, denied: Denied) -> Self {
        match denied {
            Denied::Unauthenticated => Self::Unauthenticated,
            Denied::Forbidden => Self::Forbidden,
            Denied::Hidden => Self::NotFound(resource.noun()),
        }
    }
}

impl From<StoreError> for ShopError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateReview => Self::invalid("product", ReviewError::AlreadyReviewed.to_string()),
            StoreError::DuplicateFavorite => Self::invalid("product", FavoriteError::AlreadyFavorited.to_string()),
            StoreError::MissingProduct(_) => Self::NotFound(Resource::Product.noun()),
            StoreError::Order(e) => e.into(),
            other => Self::Store(other),
        }
    }
}

impl From<ValidationErrors> for ShopError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        flatten_errors("", &errors, &mut fields);
        Self::Validation(fields)
    }
}

fn flatten_errors(prefix: &str, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() { field.to_string() } else { format!("{prefix}.{field}") };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = list.iter().map(|e| e.message.as_ref().map_or_else(|| e.code.to_string(), |m| m.to_string()));
                out.entry(key).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(inner) => flatten_errors(&key, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items { flatten_errors(&format!("{key}[{index}]"), inner, out); }
            }
        }
    }
}

impl From<OrderError> for ShopError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::UnknownStatus(_) => Self::invalid("status", e.to_string()),
            OrderError::NoPositions | OrderError::DuplicateProducts | OrderError::SumTooLarge => {
                Self::invalid("positions", e.to_string())
            }
        }
    }
}

impl From<CollectionError> for ShopError {
    fn from(e: CollectionError) -> Self {
        match e {
            CollectionError::MissingTitle | CollectionError::TitleTooLong => Self::invalid("title", e.to_string()),
            CollectionError::NoProducts | CollectionError::DuplicateProducts => Self::invalid("products_list", e.to_string()),
        }
    }
}

impl From<ProductError> for ShopError {
    fn from(e: ProductError) -> Self { Self::invalid("name", e.to_string()) }
}

impl From<MoneyError> for ShopError {
    fn from(e: MoneyError) -> Self { Self::invalid("price", e.to_string()) }
}

impl From<ReviewError> for ShopError {
    fn from(e: ReviewError) -> Self {
        match e {
            ReviewError::RatingOutOfRange(_) => Self::invalid("rating", e.to_string()),
            ReviewError::AlreadyReviewed => Self::invalid("product", e.to_string()),
        }
    }
}
