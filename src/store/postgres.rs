//! Postgres store over a `sqlx` pool.
//!
//! Aggregate writes run in one transaction each; dropping the transaction on an
//! early return rolls it back. Cascades are declared on the foreign keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;
use crate::domain::aggregates::{order, Collection, Favorite, Member, Order, OrderLine, OrderStatus, Product, ProductReview};
use crate::domain::policy::Identity;
use crate::domain::value_objects::Money;
use crate::filters::{like_pattern, OrderFilter, ProductFilter, ReviewFilter};
use super::{CollectionRevision, OrderRevision, Store, StoreError, StoreResult};

const PRODUCT_COLUMNS: &str = "id, name, description, price, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, user_id, product_id, text, rating, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, status, order_sum, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow { id: Uuid, name: String, description: String, price: Decimal, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self { id: r.id, name: r.name, description: r.description, price: Money::rounded(r.price), created_at: r.created_at, updated_at: r.updated_at }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow { id: Uuid, user_id: Uuid, product_id: Uuid, text: String, rating: i16, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl From<ReviewRow> for ProductReview {
    fn from(r: ReviewRow) -> Self {
        Self { id: r.id, user: r.user_id, product: r.product_id, text: r.text, rating: r.rating, created_at: r.created_at, updated_at: r.updated_at }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow { id: Uuid, user_id: Uuid, status: String, order_sum: Decimal, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct LineRow { order_id: Uuid, product_id: Uuid, name: String, amount: i32 }

#[derive(sqlx::FromRow)]
struct CollectionRow { id: Uuid, title: String, text: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

#[derive(sqlx::FromRow)]
struct MemberRow { collection_id: Uuid, product_id: Uuid, name: String, price: Decimal }

#[derive(sqlx::FromRow)]
struct FavoriteRow { id: Uuid, user_id: Uuid, product_id: Uuid, created_at: DateTime<Utc> }

impl From<FavoriteRow> for Favorite {
    fn from(r: FavoriteRow) -> Self { Self { id: r.id, user: r.user_id, product: r.product_id, created_at: r.created_at } }
}

async fn require_products(conn: &mut PgConnection, ids: &[Uuid]) -> StoreResult<()> {
    let found: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = ANY($1)")
        .bind(ids).fetch_all(&mut *conn).await?;
    let found: HashSet<Uuid> = found.into_iter().map(|(id,)| id).collect();
    match ids.iter().find(|id| !found.contains(*id)) {
        Some(missing) => Err(StoreError::MissingProduct(*missing)),
        None => Ok(()),
    }
}

async fn load_orders(conn: &mut PgConnection, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let lines: Vec<LineRow> = sqlx::query_as(
        "SELECT po.order_id, po.product_id, p.name, po.amount FROM product_orders po \
         JOIN products p ON p.id = po.product_id WHERE po.order_id = ANY($1) ORDER BY po.id")
        .bind(&ids).fetch_all(&mut *conn).await?;
    let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for l in lines {
        by_order.entry(l.order_id).or_default().push(OrderLine { product_id: l.product_id, name: l.name, amount: l.amount });
    }
    rows.into_iter().map(|r| {
        let status: OrderStatus = r.status.parse().map_err(|e: order::OrderError| StoreError::Corrupt(e.to_string()))?;
        Ok(Order {
            id: r.id, user: r.user_id, positions: by_order.remove(&r.id).unwrap_or_default(), status,
            order_sum: Money::rounded(r.order_sum), created_at: r.created_at, updated_at: r.updated_at,
        })
    }).collect()
}

async fn fetch_order(conn: &mut PgConnection, id: Uuid, owner: Option<Uuid>) -> StoreResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)"))
        .bind(id).bind(owner).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(load_orders(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn load_collections(conn: &mut PgConnection, rows: Vec<CollectionRow>) -> StoreResult<Vec<Collection>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let members: Vec<MemberRow> = sqlx::query_as(
        "SELECT pc.collection_id, p.id AS product_id, p.name, p.price FROM product_collections pc \
         JOIN products p ON p.id = pc.product_id WHERE pc.collection_id = ANY($1) ORDER BY pc.id")
        .bind(&ids).fetch_all(&mut *conn).await?;
    let mut by_collection: HashMap<Uuid, Vec<Member>> = HashMap::new();
    for m in members {
        by_collection.entry(m.collection_id).or_default()
            .push(Member { product_id: m.product_id, name: m.name, price: Money::rounded(m.price) });
    }
    Ok(rows.into_iter().map(|r| Collection {
        id: r.id, title: r.title, text: r.text, products_list: by_collection.remove(&r.id).unwrap_or_default(),
        created_at: r.created_at, updated_at: r.updated_at,
    }).collect())
}

async fn fetch_collection(conn: &mut PgConnection, id: Uuid) -> StoreResult<Option<Collection>> {
    let row: Option<CollectionRow> = sqlx::query_as("SELECT id, title, text, created_at, updated_at FROM collections WHERE id = $1")
        .bind(id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(load_collections(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn attach_members(conn: &mut PgConnection, collection_id: Uuid, product_ids: &[Uuid]) -> StoreResult<()> {
    if product_ids.is_empty() { return Ok(()); }
    let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO product_collections (id, collection_id, product_id) ");
    builder.push_values(product_ids, |mut b, product_id| {
        b.push_bind(Uuid::now_v7()).push_bind(collection_id).push_bind(*product_id);
    });
    builder.push(" ON CONFLICT (collection_id, product_id) DO NOTHING");
    builder.build().execute(&mut *conn).await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(skip_all)]
    async fn resolve_token(&self, token: &str) -> StoreResult<Option<Identity>> {
        let row: Option<(Uuid, bool)> = sqlx::query_as("SELECT user_id, is_staff FROM api_tokens WHERE key = $1")
            .bind(token).fetch_optional(&self.pool).await?;
        Ok(row.map(|(user_id, is_staff)| Identity { user_id, is_staff }))
    }

    #[tracing::instrument(skip(self))]
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut q = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
        if let Some(name) = &filter.name { q.push(" AND name LIKE ").push_bind(like_pattern(name)); }
        if let Some(description) = &filter.description { q.push(" AND description LIKE ").push_bind(like_pattern(description)); }
        if let Some(min) = filter.price_min { q.push(" AND price >= ").push_bind(min); }
        if let Some(max) = filter.price_max { q.push(" AND price <= ").push_bind(max); }
        q.push(" ORDER BY id");
        let rows: Vec<ProductRow> = q.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    #[tracing::instrument(skip(self))]
    async fn get_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[tracing::instrument(skip_all, fields(product_id = %product.id))]
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query("INSERT INTO products (id, name, description, price, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(product.id).bind(&product.name).bind(&product.description).bind(product.price.amount())
            .bind(product.created_at).bind(product.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(product_id = %product.id))]
    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE products SET name = $2, description = $3, price = $4 WHERE id = $1")
            .bind(product.id).bind(&product.name).bind(&product.description).bind(product.price.amount())
            .execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn list_reviews(&self, filter: &ReviewFilter) -> StoreResult<Vec<ProductReview>> {
        let mut q = QueryBuilder::<Postgres>::new(format!("SELECT {REVIEW_COLUMNS} FROM product_reviews WHERE TRUE"));
        if let Some(user) = filter.user { q.push(" AND user_id = ").push_bind(user); }
        if let Some(product) = filter.product { q.push(" AND product_id = ").push_bind(product); }
        if let Some(after) = filter.created_at_after { q.push(" AND created_at::date >= ").push_bind(after); }
        if let Some(before) = filter.created_at_before { q.push(" AND created_at::date <= ").push_bind(before); }
        q.push(" ORDER BY updated_at DESC, created_at DESC, id DESC");
        let rows: Vec<ReviewRow> = q.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ProductReview::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_review(&self, id: Uuid) -> StoreResult<Option<ProductReview>> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!("SELECT {REVIEW_COLUMNS} FROM product_reviews WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(ProductReview::from))
    }

    #[tracing::instrument(skip_all, fields(user_id = %review.user, product_id = %review.product))]
    async fn insert_review(&self, review: &ProductReview) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        require_products(&mut tx, &[review.product]).await?;
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM product_reviews WHERE user_id = $1 AND product_id = $2")
            .bind(review.user).bind(review.product).fetch_optional(&mut *tx).await?;
        if existing.is_some() { return Err(StoreError::DuplicateReview); }
        sqlx::query(&format!("INSERT INTO product_reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"))
            .bind(review.id).bind(review.user).bind(review.product).bind(&review.text).bind(review.rating)
            .bind(review.created_at).bind(review.updated_at)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(review_id = %review.id))]
    async fn update_review(&self, review: &ProductReview) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE product_reviews SET text = $2, rating = $3 WHERE id = $1")
            .bind(review.id).bind(&review.text).bind(review.rating)
            .execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM product_reviews WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn list_orders(&self, owner: Option<Uuid>, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut q = QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));
        if let Some(owner) = owner { q.push(" AND user_id = ").push_bind(owner); }
        if let Some(status) = filter.status { q.push(" AND status = ").push_bind(status.as_str()); }
        if let Some(min) = filter.order_sum_min { q.push(" AND order_sum >= ").push_bind(min); }
        if let Some(max) = filter.order_sum_max { q.push(" AND order_sum <= ").push_bind(max); }
        if let Some(after) = filter.created_at_after { q.push(" AND created_at::date >= ").push_bind(after); }
        if let Some(before) = filter.created_at_before { q.push(" AND created_at::date <= ").push_bind(before); }
        if let Some(after) = filter.updated_at_after { q.push(" AND updated_at::date >= ").push_bind(after); }
        if let Some(before) = filter.updated_at_before { q.push(" AND updated_at::date <= ").push_bind(before); }
        if let Some(product_id) = filter.product_id {
            q.push(" AND EXISTS (SELECT 1 FROM product_orders po WHERE po.order_id = orders.id AND po.product_id = ")
                .push_bind(product_id).push(")");
        }
        q.push(" ORDER BY updated_at DESC, created_at DESC, id DESC");
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<OrderRow> = q.build_query_as().fetch_all(&mut *conn).await?;
        load_orders(&mut conn, rows).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_order(&self, id: Uuid, owner: Option<Uuid>) -> StoreResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id, owner).await
    }

    #[tracing::instrument(skip_all, fields(order_id = %order.id, lines = order.positions.len()))]
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let product_ids: Vec<Uuid> = order.product_ids().collect();
        require_products(&mut tx, &product_ids).await?;
        sqlx::query(&format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"))
            .bind(order.id).bind(order.user).bind(order.status.as_str()).bind(order.order_sum.amount())
            .bind(order.created_at).bind(order.updated_at)
            .execute(&mut *tx).await?;
        let mut lines = QueryBuilder::<Postgres>::new("INSERT INTO product_orders (id, order_id, product_id, amount) ");
        lines.push_values(&order.positions, |mut b, line| {
            b.push_bind(Uuid::now_v7()).push_bind(order.id).push_bind(line.product_id).push_bind(line.amount);
        });
        lines.build().execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, revision), fields(positions = revision.positions.len()))]
    async fn revise_order(&self, id: Uuid, revision: &OrderRevision) -> StoreResult<Option<Order>> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&mut *tx).await?;
        if exists.is_none() { return Ok(None); }
        let product_ids: Vec<Uuid> = revision.positions.iter().map(|(product_id, _)| *product_id).collect();
        require_products(&mut tx, &product_ids).await?;
        for (product_id, amount) in &revision.positions {
            sqlx::query(
                "INSERT INTO product_orders (id, order_id, product_id, amount) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (order_id, product_id) DO UPDATE SET amount = EXCLUDED.amount")
                .bind(Uuid::now_v7()).bind(id).bind(product_id).bind(amount)
                .execute(&mut *tx).await?;
        }
        let priced: Vec<(Decimal, i32)> = sqlx::query_as(
            "SELECT p.price, po.amount FROM product_orders po JOIN products p ON p.id = po.product_id WHERE po.order_id = $1")
            .bind(id).fetch_all(&mut *tx).await?;
        let order_sum = order::total_of(priced.into_iter().map(|(price, amount)| (Money::rounded(price), amount)))?;
        sqlx::query("UPDATE orders SET order_sum = $2, status = COALESCE($3, status) WHERE id = $1")
            .bind(id).bind(order_sum.amount()).bind(revision.status.map(|s| s.as_str()))
            .execute(&mut *tx).await?;
        let order = fetch_order(&mut tx, id, None).await?;
        tx.commit().await?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_order(&self, id: Uuid, owner: Option<Uuid>) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id).bind(owner).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<CollectionRow> = sqlx::query_as(
            "SELECT id, title, text, created_at, updated_at FROM collections ORDER BY updated_at DESC, created_at DESC, id DESC")
            .fetch_all(&mut *conn).await?;
        load_collections(&mut conn, rows).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_collection(&self, id: Uuid) -> StoreResult<Option<Collection>> {
        let mut conn = self.pool.acquire().await?;
        fetch_collection(&mut conn, id).await
    }

    #[tracing::instrument(skip_all, fields(collection_id = %collection.id, members = collection.products_list.len()))]
    async fn insert_collection(&self, collection: &Collection) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let product_ids: Vec<Uuid> = collection.products_list.iter().map(|m| m.product_id).collect();
        require_products(&mut tx, &product_ids).await?;
        sqlx::query("INSERT INTO collections (id, title, text, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(collection.id).bind(&collection.title).bind(&collection.text)
            .bind(collection.created_at).bind(collection.updated_at)
            .execute(&mut *tx).await?;
        attach_members(&mut tx, collection.id, &product_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, revision), fields(add = revision.add_products.len()))]
    async fn revise_collection(&self, id: Uuid, revision: &CollectionRevision) -> StoreResult<Option<Collection>> {
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query("UPDATE collections SET title = COALESCE($2, title), text = COALESCE($3, text) WHERE id = $1")
            .bind(id).bind(revision.title.as_deref()).bind(revision.text.as_deref())
            .execute(&mut *tx).await?;
        if done.rows_affected() == 0 { return Ok(None); }
        require_products(&mut tx, &revision.add_products).await?;
        attach_members(&mut tx, id, &revision.add_products).await?;
        let collection = fetch_collection(&mut tx, id).await?;
        tx.commit().await?;
        Ok(collection)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_collection(&self, id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM collections WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn list_favorites(&self, user: Uuid) -> StoreResult<Vec<Favorite>> {
        let rows: Vec<FavoriteRow> = sqlx::query_as("SELECT id, user_id, product_id, created_at FROM favorites WHERE user_id = $1 ORDER BY id")
            .bind(user).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Favorite::from).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_favorite(&self, id: Uuid, user: Uuid) -> StoreResult<Option<Favorite>> {
        let row: Option<FavoriteRow> = sqlx::query_as("SELECT id, user_id, product_id, created_at FROM favorites WHERE id = $1 AND user_id = $2")
            .bind(id).bind(user).fetch_optional(&self.pool).await?;
        Ok(row.map(Favorite::from))
    }

    #[tracing::instrument(skip_all, fields(user_id = %favorite.user, product_id = %favorite.product))]
    async fn insert_favorite(&self, favorite: &Favorite) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        require_products(&mut tx, &[favorite.product]).await?;
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(favorite.user).bind(favorite.product).fetch_optional(&mut *tx).await?;
        if existing.is_some() { return Err(StoreError::DuplicateFavorite); }
        sqlx::query("INSERT INTO favorites (id, user_id, product_id, created_at) VALUES ($1, $2, $3, $4)")
            .bind(favorite.id).bind(favorite.user).bind(favorite.product).bind(favorite.created_at)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_favorite(&self, id: Uuid, user: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM favorites WHERE id = $1 AND user_id = $2")
            .bind(id).bind(user).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }
}
