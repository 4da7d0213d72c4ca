//! Order aggregate workflow.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::order::{self, OWNER_FIELDS, STAFF_FIELDS};
use crate::domain::aggregates::{Order, OrderStatus, Product};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::policy::{Action, Principal, Resource};
use crate::filters::OrderFilter;
use crate::store::OrderRevision;
use crate::{Result, ShopError};
use super::{actor, decode, ensure_fields, guard, Patch, Shop};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PositionPayload {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000000, message = "amount must be between 1 and 1000000"))]
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderPayload {
    #[serde(default)]
    #[validate]
    pub positions: Vec<PositionPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrderPatch {
    #[serde(default)]
    #[validate]
    pub positions: Vec<PositionPayload>,
    pub status: Option<OrderStatus>,
}

const ORDER: Resource = Resource::Order;

impl Shop {
    pub async fn list_orders(&self, principal: &Principal, filter: &OrderFilter) -> Result<Vec<Order>> {
        guard(ORDER, Action::Read, principal, None)?;
        Ok(self.store.list_orders(principal.scope(), filter).await?)
    }

    pub async fn get_order(&self, principal: &Principal, id: Uuid) -> Result<Order> {
        guard(ORDER, Action::Read, principal, None)?;
        let order = self.store.get_order(id, principal.scope()).await?.ok_or(ShopError::NotFound(ORDER.noun()))?;
        guard(ORDER, Action::Read, principal, Some(order.user))?;
        Ok(order)
    }

    /// Validates positions, prices them at current product prices and stores
    /// the order with all of its lines in one write.
    #[tracing::instrument(skip_all)]
    pub async fn place_order(&self, principal: &Principal, payload: OrderPayload) -> Result<Order> {
        guard(ORDER, Action::Create, principal, None)?;
        let identity = actor(principal)?;
        payload.validate()?;
        let ids: Vec<Uuid> = payload.positions.iter().map(|p| p.product_id).collect();
        order::ensure_positions(&ids).inspect_err(|e| tracing::warn!(error = %e, "order rejected"))?;
        let products = self.resolve_products(&ids).await?;
        let lines: Vec<(Product, i32)> = products.into_iter()
            .zip(payload.positions.iter().map(|p| p.amount))
            .collect();
        let order = Order::place(identity.user_id, &lines)?;
        self.store.insert_order(&order).await?;
        tracing::info!(order_id = %order.id, user_id = %order.user, order_sum = %order.order_sum, lines = order.positions.len(), "order placed");
        self.events.publish(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id, user_id: order.user, order_sum: order.order_sum.amount(), lines: order.positions.len(),
        })).await;
        Ok(order)
    }

    /// Owners may resubmit positions; staff may also set the status. Supplied
    /// positions are upserted by product and the total is always recomputed.
    #[tracing::instrument(skip(self, principal, patch))]
    pub async fn revise_order(&self, principal: &Principal, id: Uuid, patch: Patch) -> Result<Order> {
        guard(ORDER, Action::Update, principal, None)?;
        let current = self.store.get_order(id, principal.scope()).await?.ok_or(ShopError::NotFound(ORDER.noun()))?;
        guard(ORDER, Action::Update, principal, Some(current.user))?;
        let allowed: &[&str] = if principal.is_staff() { &STAFF_FIELDS } else { &OWNER_FIELDS };
        ensure_fields(&patch, allowed).inspect_err(|_| tracing::warn!(order_id = %id, "order patch names a read-only field"))?;
        let payload: OrderPatch = decode(patch)?;
        payload.validate()?;
        let ids: Vec<Uuid> = payload.positions.iter().map(|p| p.product_id).collect();
        self.resolve_products(&ids).await?;
        let revision = OrderRevision {
            positions: payload.positions.iter().map(|p| (p.product_id, p.amount)).collect(),
            status: payload.status,
        };
        let order = self.store.revise_order(id, &revision).await?.ok_or(ShopError::NotFound(ORDER.noun()))?;
        tracing::info!(order_id = %order.id, status = %order.status, order_sum = %order.order_sum, "order revised");
        self.events.publish(DomainEvent::Order(OrderEvent::Revised {
            order_id: order.id, status: order.status, order_sum: order.order_sum.amount(), lines: order.positions.len(),
        })).await;
        Ok(order)
    }

    pub async fn delete_order(&self, principal: &Principal, id: Uuid) -> Result<()> {
        guard(ORDER, Action::Delete, principal, None)?;
        if !self.store.delete_order(id, principal.scope()).await? { return Err(ShopError::NotFound(ORDER.noun())); }
        tracing::info!(order_id = %id, "order deleted");
        self.events.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: id })).await;
        Ok(())
    }
}
