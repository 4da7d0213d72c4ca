//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, MoneyError};

/// Fields an order owner may revise.
pub const OWNER_FIELDS: [&str; 1] = ["positions"];
/// Fields staff may revise.
pub const STAFF_FIELDS: [&str; 2] = ["positions", "status"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user: Uuid,
    pub positions: Vec<OrderLine>,
    pub status: OrderStatus,
    pub order_sum: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine { pub product_id: Uuid, pub name: String, pub amount: i32 }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] New, InProgress, Done }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::New => "NEW", Self::InProgress => "IN_PROGRESS", Self::Done => "DONE" }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Rejects an empty position list and repeated products.
pub fn ensure_positions(product_ids: &[Uuid]) -> Result<(), OrderError> {
    if product_ids.is_empty() { return Err(OrderError::NoPositions); }
    let distinct: HashSet<&Uuid> = product_ids.iter().collect();
    if distinct.len() != product_ids.len() { return Err(OrderError::DuplicateProducts); }
    Ok(())
}

/// Largest total a `NUMERIC(14, 2)` column holds.
pub fn max_order_sum() -> Decimal { Decimal::new(99_999_999_999_999, 2) }

/// Σ price × amount, rounded to cents.
pub fn total_of<I>(lines: I) -> Result<Money, OrderError>
where
    I: IntoIterator<Item = (Money, i32)>,
{
    let mut sum = Money::zero();
    for (price, amount) in lines {
        sum = sum.checked_add(price.times(amount)?)?;
    }
    let total = Money::rounded(sum.amount());
    if total.amount() > max_order_sum() { return Err(OrderError::SumTooLarge); }
    Ok(total)
}

impl Order {
    /// Builds a NEW order from resolved products, pricing it at current prices.
    pub fn place(user: Uuid, lines: &[(Product, i32)]) -> Result<Self, OrderError> {
        let ids: Vec<Uuid> = lines.iter().map(|(p, _)| p.id).collect();
        ensure_positions(&ids)?;
        let order_sum = total_of(lines.iter().map(|(p, amount)| (p.price, *amount)))?;
        let positions = lines.iter()
            .map(|(p, amount)| OrderLine { product_id: p.id, name: p.name.clone(), amount: *amount })
            .collect();
        let now = Utc::now();
        Ok(Self { id: Uuid::now_v7(), user, positions, status: OrderStatus::New, order_sum, created_at: now, updated_at: now })
    }

    pub fn is_owned_by(&self, user: Uuid) -> bool { self.user == user }

    pub fn product_ids(&self) -> impl Iterator<Item = Uuid> + '_ { self.positions.iter().map(|l| l.product_id) }

    /// Overwrites the amount of an existing line for `product_id`, or appends a new one.
    pub fn upsert_position(&mut self, product_id: Uuid, name: impl Into<String>, amount: i32) {
        match self.positions.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.amount = amount,
            None => self.positions.push(OrderLine { product_id, name: name.into(), amount }),
        }
    }

    /// Recomputes `order_sum` over every line at the given prices; lines without a price count as zero.
    pub fn reprice(&mut self, prices: &HashMap<Uuid, Money>) -> Result<(), OrderError> {
        self.order_sum = total_of(self.positions.iter()
            .filter_map(|l| prices.get(&l.product_id).map(|price| (*price, l.amount))))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("no products given")]
    NoPositions,
    #[error("order contains duplicate products")]
    DuplicateProducts,
    #[error("unknown order status `{0}`")]
    UnknownStatus(String),
    #[error("order total must not exceed 999999999999.99")]
    SumTooLarge,
}

impl From<MoneyError> for OrderError {
    fn from(_: MoneyError) -> Self { Self::SumTooLarge }
}
