//! In-memory store.
//!
//! Each write holds the table lock for its whole duration and validates before
//! mutating, so a failed write leaves no trace.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::domain::aggregates::{Collection, Favorite, Member, Order, Product, ProductReview};
use crate::domain::policy::Identity;
use crate::domain::value_objects::Money;
use crate::filters::{OrderFilter, ProductFilter, ReviewFilter};
use super::{CollectionRevision, OrderRevision, Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    tokens: HashMap<String, Identity>,
    products: BTreeMap<Uuid, Product>,
    reviews: BTreeMap<Uuid, ProductReview>,
    orders: BTreeMap<Uuid, Order>,
    collections: BTreeMap<Uuid, Collection>,
    favorites: BTreeMap<Uuid, Favorite>,
}

impl Tables {
    fn require_products(&self, ids: impl IntoIterator<Item = Uuid>) -> StoreResult<()> {
        match ids.into_iter().find(|id| !self.products.contains_key(id)) {
            Some(missing) => Err(StoreError::MissingProduct(missing)),
            None => Ok(()),
        }
    }

    fn prices(&self) -> HashMap<Uuid, Money> {
        self.products.values().map(|p| (p.id, p.price)).collect()
    }

    /// Line names follow the product's current name.
    fn hydrate_order(&self, mut order: Order) -> Order {
        for line in &mut order.positions {
            if let Some(product) = self.products.get(&line.product_id) { line.name = product.name.clone(); }
        }
        order
    }

    fn hydrate_collection(&self, mut collection: Collection) -> Collection {
        for member in &mut collection.products_list {
            if let Some(product) = self.products.get(&member.product_id) { *member = Member::from(product); }
        }
        collection
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Registers a token for an identity, standing in for the external identity provider.
    pub async fn issue_token(&self, identity: Identity) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tables.write().await.tokens.insert(token.clone(), identity);
        token
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>, Uuid)) {
    items.sort_by_key(|item| Reverse(key(item)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn resolve_token(&self, token: &str) -> StoreResult<Option<Identity>> {
        Ok(self.tables.read().await.tokens.get(token).copied())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.tables.write().await.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.products.get_mut(&product.id) {
            Some(existing) => { *existing = product.clone(); Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.products.remove(&id).is_none() { return Ok(false); }
        tables.reviews.retain(|_, r| r.product != id);
        tables.favorites.retain(|_, f| f.product != id);
        for order in tables.orders.values_mut() { order.positions.retain(|l| l.product_id != id); }
        for collection in tables.collections.values_mut() { collection.products_list.retain(|m| m.product_id != id); }
        Ok(true)
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<ProductReview>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<ProductReview> = tables.reviews.values().filter(|r| filter.matches(r)).cloned().collect();
        newest_first(&mut reviews, |r| (r.updated_at, r.created_at, r.id));
        Ok(reviews)
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<ProductReview>> {
        Ok(self.tables.read().await.reviews.get(&id).cloned())
    }

    async fn insert_review(&self, review: &ProductReview) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_products([review.product])?;
        if tables.reviews.values().any(|r| r.user == review.user && r.product == review.product) {
            return Err(StoreError::DuplicateReview);
        }
        tables.reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn update_review(&self, review: &ProductReview) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.reviews.get_mut(&review.id) {
            Some(existing) => { *existing = review.clone(); Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }

    async fn list_orders(&self, owner: Option<Uuid>, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.values()
            .filter(|o| owner.map_or(true, |u| o.is_owned_by(u)) && filter.matches(o))
            .map(|o| tables.hydrate_order(o.clone()))
            .collect();
        newest_first(&mut orders, |o| (o.updated_at, o.created_at, o.id));
        Ok(orders)
    }

    async fn get_order(&self, id: Uuid, owner: Option<Uuid>) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id)
            .filter(|o| owner.map_or(true, |u| o.is_owned_by(u)))
            .map(|o| tables.hydrate_order(o.clone())))
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_products(order.product_ids())?;
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn revise_order(&self, id: Uuid, revision: &OrderRevision) -> StoreResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        let Some(mut order) = tables.orders.get(&id).cloned() else { return Ok(None) };
        tables.require_products(revision.positions.iter().map(|(product_id, _)| *product_id))?;
        for (product_id, amount) in &revision.positions {
            let name = tables.products.get(product_id).map(|p| p.name.clone()).unwrap_or_default();
            order.upsert_position(*product_id, name, *amount);
        }
        if let Some(status) = revision.status { order.status = status; }
        order.reprice(&tables.prices())?;
        tables.orders.insert(id, order.clone());
        Ok(Some(tables.hydrate_order(order)))
    }

    async fn delete_order(&self, id: Uuid, owner: Option<Uuid>) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let visible = tables.orders.get(&id).is_some_and(|o| owner.map_or(true, |u| o.is_owned_by(u)));
        if visible { tables.orders.remove(&id); }
        Ok(visible)
    }

    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let tables = self.tables.read().await;
        let mut collections: Vec<Collection> = tables.collections.values()
            .map(|c| tables.hydrate_collection(c.clone()))
            .collect();
        newest_first(&mut collections, |c| (c.updated_at, c.created_at, c.id));
        Ok(collections)
    }

    async fn get_collection(&self, id: Uuid) -> StoreResult<Option<Collection>> {
        let tables = self.tables.read().await;
        Ok(tables.collections.get(&id).map(|c| tables.hydrate_collection(c.clone())))
    }

    async fn insert_collection(&self, collection: &Collection) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_products(collection.products_list.iter().map(|m| m.product_id))?;
        tables.collections.insert(collection.id, collection.clone());
        Ok(())
    }

    async fn revise_collection(&self, id: Uuid, revision: &CollectionRevision) -> StoreResult<Option<Collection>> {
        let mut tables = self.tables.write().await;
        let Some(mut collection) = tables.collections.get(&id).cloned() else { return Ok(None) };
        tables.require_products(revision.add_products.iter().copied())?;
        let added: Vec<Product> = revision.add_products.iter().filter_map(|p| tables.products.get(p).cloned()).collect();
        collection.add_members(&added);
        if let Some(title) = &revision.title { collection.title = title.clone(); }
        if let Some(text) = &revision.text { collection.text = text.clone(); }
        tables.collections.insert(id, collection.clone());
        Ok(Some(tables.hydrate_collection(collection)))
    }

    async fn delete_collection(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.collections.remove(&id).is_some())
    }

    async fn list_favorites(&self, user: Uuid) -> StoreResult<Vec<Favorite>> {
        let tables = self.tables.read().await;
        Ok(tables.favorites.values().filter(|f| f.user == user).cloned().collect())
    }

    async fn get_favorite(&self, id: Uuid, user: Uuid) -> StoreResult<Option<Favorite>> {
        Ok(self.tables.read().await.favorites.get(&id).filter(|f| f.user == user).cloned())
    }

    async fn insert_favorite(&self, favorite: &Favorite) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_products([favorite.product])?;
        if tables.favorites.values().any(|f| f.user == favorite.user && f.product == favorite.product) {
            return Err(StoreError::DuplicateFavorite);
        }
        tables.favorites.insert(favorite.id, favorite.clone());
        Ok(())
    }

    async fn delete_favorite(&self, id: Uuid, user: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables.favorites.get(&id).is_some_and(|f| f.user == user);
        if owned { tables.favorites.remove(&id); }
        Ok(owned)
    }
}
