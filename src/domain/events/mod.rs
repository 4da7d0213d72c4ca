//! Domain events
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use uuid::Uuid;
use crate::domain::aggregates::OrderStatus;

/// Serialized as the variant's fields plus `"event": <name>`.
#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Collection(CollectionEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProductEvent {
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, order_sum: Decimal, lines: usize },
    Revised { order_id: Uuid, status: OrderStatus, order_sum: Decimal, lines: usize },
    Deleted { order_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionEvent {
    Created { collection_id: Uuid, members: usize },
    Revised { collection_id: Uuid, added: usize },
}

impl DomainEvent {
    /// Subject suffix, e.g. `order.placed`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Deleted { .. }) => "product.deleted",
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::Revised { .. }) => "order.revised",
            Self::Order(OrderEvent::Deleted { .. }) => "order.deleted",
            Self::Collection(CollectionEvent::Created { .. }) => "collection.created",
            Self::Collection(CollectionEvent::Revised { .. }) => "collection.revised",
        }
    }
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    event: &'static str,
    #[serde(flatten)]
    payload: &'a T,
}

impl Serialize for DomainEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let event = self.name();
        match self {
            Self::Product(payload) => Tagged { event, payload }.serialize(serializer),
            Self::Order(payload) => Tagged { event, payload }.serialize(serializer),
            Self::Collection(payload) => Tagged { event, payload }.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_is_tagged() {
        let id = Uuid::now_v7();
        let event = DomainEvent::Collection(CollectionEvent::Revised { collection_id: id, added: 2 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "collection.revised");
        assert_eq!(json["added"], 2);
        assert_eq!(json["collection_id"], id.to_string());
    }

    #[test]
    fn test_deletions_of_different_aggregates_are_distinguishable() {
        let product = serde_json::to_value(DomainEvent::Product(ProductEvent::Deleted { product_id: Uuid::now_v7() })).unwrap();
        let order = serde_json::to_value(DomainEvent::Order(OrderEvent::Deleted { order_id: Uuid::now_v7() })).unwrap();
        assert_eq!(product["event"], "product.deleted");
        assert_eq!(order["event"], "order.deleted");
    }
}
