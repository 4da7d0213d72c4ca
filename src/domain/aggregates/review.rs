//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// Review fields the author (or staff) may change after creation.
pub const EDITABLE_FIELDS: [&str; 2] = ["rating", "text"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReview {
    pub id: Uuid,
    pub user: Uuid,
    pub product: Uuid,
    pub text: String,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductReview {
    pub fn write(user: Uuid, product: Uuid, text: impl Into<String>, rating: i16) -> Result<Self, ReviewError> {
        check_rating(rating)?;
        let now = Utc::now();
        Ok(Self { id: Uuid::now_v7(), user, product, text: text.into(), rating, created_at: now, updated_at: now })
    }

    pub fn edit(&mut self, text: Option<String>, rating: Option<i16>) -> Result<(), ReviewError> {
        if let Some(rating) = rating {
            check_rating(rating)?;
            self.rating = rating;
        }
        if let Some(text) = text { self.text = text; }
        Ok(())
    }
}

fn check_rating(rating: i16) -> Result<(), ReviewError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) { return Err(ReviewError::RatingOutOfRange(rating)); }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i16),
    #[error("only one review per product is allowed")]
    AlreadyReviewed,
}
