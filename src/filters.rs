//! List filters accepted as query parameters.
//!
//! Each filter knows how to test an in-memory record; the Postgres store
//! translates the same fields into `WHERE` clauses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderStatus, Product, ProductReview};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewFilter {
    pub user: Option<Uuid>,
    pub product: Option<Uuid>,
    pub created_at_after: Option<NaiveDate>,
    pub created_at_before: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub order_sum_min: Option<Decimal>,
    pub order_sum_max: Option<Decimal>,
    pub created_at_after: Option<NaiveDate>,
    pub created_at_before: Option<NaiveDate>,
    pub updated_at_after: Option<NaiveDate>,
    pub updated_at_before: Option<NaiveDate>,
    pub product_id: Option<Uuid>,
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

fn on_dates(stamp: DateTime<Utc>, after: Option<NaiveDate>, before: Option<NaiveDate>) -> bool {
    within(stamp.date_naive(), after, before)
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.name.as_deref().map_or(true, |n| product.name.contains(n))
            && self.description.as_deref().map_or(true, |d| product.description.contains(d))
            && within(product.price.amount(), self.price_min, self.price_max)
    }
}

impl ReviewFilter {
    pub fn matches(&self, review: &ProductReview) -> bool {
        self.user.map_or(true, |u| review.user == u)
            && self.product.map_or(true, |p| review.product == p)
            && on_dates(review.created_at, self.created_at_after, self.created_at_before)
    }
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && within(order.order_sum.amount(), self.order_sum_min, self.order_sum_max)
            && on_dates(order.created_at, self.created_at_after, self.created_at_before)
            && on_dates(order.updated_at, self.updated_at_after, self.updated_at_before)
            && self.product_id.map_or(true, |p| order.product_ids().any(|id| id == p))
    }
}

/// `LIKE` pattern for a literal substring.
pub fn like_pattern(needle: &str) -> String {
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}
