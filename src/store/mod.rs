//! Storage seam.
//!
//! Every aggregate write is one method on [`Store`] and must be all-or-nothing:
//! the root row and every owned child row it touches commit together.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::aggregates::{Collection, Favorite, Order, OrderError, OrderStatus, Product, ProductReview};
use crate::domain::policy::Identity;
use crate::filters::{OrderFilter, ProductFilter, ReviewFilter};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a review by this user for this product already exists")]
    DuplicateReview,
    #[error("this product is already in the user's favorites")]
    DuplicateFavorite,
    #[error("referenced product {0} does not exist")]
    MissingProduct(Uuid),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Changes applied to one order inside a single transaction.
#[derive(Debug, Clone, Default)]
pub struct OrderRevision {
    /// Upserted by product: an existing line gets its amount overwritten.
    pub positions: Vec<(Uuid, i32)>,
    pub status: Option<OrderStatus>,
}

/// Changes applied to one collection inside a single transaction.
#[derive(Debug, Clone, Default)]
pub struct CollectionRevision {
    pub title: Option<String>,
    pub text: Option<String>,
    /// Products to attach; ones already attached are skipped.
    pub add_products: Vec<Uuid>,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn resolve_token(&self, token: &str) -> StoreResult<Option<Identity>>;

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    /// Found products, in no particular order; missing ids are simply absent.
    async fn get_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn update_product(&self, product: &Product) -> StoreResult<bool>;
    /// Cascades to reviews, order lines, collection memberships and favorites.
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<ProductReview>>;
    async fn get_review(&self, id: Uuid) -> StoreResult<Option<ProductReview>>;
    /// Fails with [`StoreError::DuplicateReview`] if the (user, product) pair is taken.
    async fn insert_review(&self, review: &ProductReview) -> StoreResult<()>;
    async fn update_review(&self, review: &ProductReview) -> StoreResult<bool>;
    async fn delete_review(&self, id: Uuid) -> StoreResult<bool>;

    /// `owner` restricts the result to one user's orders.
    async fn list_orders(&self, owner: Option<Uuid>, filter: &OrderFilter) -> StoreResult<Vec<Order>>;
    async fn get_order(&self, id: Uuid, owner: Option<Uuid>) -> StoreResult<Option<Order>>;
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    /// Upserts lines, applies status, then recomputes `order_sum` from every
    /// stored line at current product prices.
    async fn revise_order(&self, id: Uuid, revision: &OrderRevision) -> StoreResult<Option<Order>>;
    async fn delete_order(&self, id: Uuid, owner: Option<Uuid>) -> StoreResult<bool>;

    async fn list_collections(&self) -> StoreResult<Vec<Collection>>;
    async fn get_collection(&self, id: Uuid) -> StoreResult<Option<Collection>>;
    async fn insert_collection(&self, collection: &Collection) -> StoreResult<()>;
    async fn revise_collection(&self, id: Uuid, revision: &CollectionRevision) -> StoreResult<Option<Collection>>;
    async fn delete_collection(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_favorites(&self, user: Uuid) -> StoreResult<Vec<Favorite>>;
    async fn get_favorite(&self, id: Uuid, user: Uuid) -> StoreResult<Option<Favorite>>;
    /// Fails with [`StoreError::DuplicateFavorite`] if the user already favorited the product.
    async fn insert_favorite(&self, favorite: &Favorite) -> StoreResult<()>;
    async fn delete_favorite(&self, id: Uuid, user: Uuid) -> StoreResult<bool>;
}
