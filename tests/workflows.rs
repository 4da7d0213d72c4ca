use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use storefront_api::domain::aggregates::{OrderStatus, Product};
use storefront_api::publisher::EventPublisher;
use storefront_api::store::MemoryStore;
use storefront_api::workflows::{
    CollectionPatch, CollectionPayload, FavoritePayload, MemberPayload, OrderPayload, Patch, PositionPayload,
    ProductPatch, ProductPayload, ReviewPayload,
};
use storefront_api::{Principal, Shop, ShopError};

fn shop() -> Shop { Shop::new(Arc::new(MemoryStore::new()), EventPublisher::disabled()) }

fn patch(value: Value) -> Patch { value.as_object().cloned().unwrap() }

fn cents(value: i64) -> Decimal { Decimal::new(value, 2) }

async fn product(shop: &Shop, name: &str, price: Decimal) -> Product {
    let payload = ProductPayload { name: name.into(), description: String::new(), price };
    shop.create_product(&Principal::staff(Uuid::now_v7()), payload).await.unwrap()
}

fn positions(lines: &[(Uuid, i32)]) -> OrderPayload {
    OrderPayload { positions: lines.iter().map(|&(product_id, amount)| PositionPayload { product_id, amount }).collect() }
}

fn members(ids: &[Uuid]) -> Vec<MemberPayload> { ids.iter().map(|&product_id| MemberPayload { product_id }).collect() }

fn field_errors(err: ShopError) -> Vec<String> {
    match err {
        ShopError::Validation(fields) => fields.keys().cloned().collect(),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_order_sum_is_price_times_amount() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(1050)).await;
    let mug = product(&shop, "mug", cents(333)).await;
    let user = Principal::user(Uuid::now_v7());

    let order = shop.place_order(&user, positions(&[(tea.id, 2), (mug.id, 3)])).await.unwrap();

    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.order_sum.amount(), cents(3099));
    assert_eq!(order.positions.len(), 2);
    assert_eq!(order.positions[0].name, "tea");
}

#[tokio::test]
async fn test_order_rejects_duplicate_and_empty_positions() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let user = Principal::user(Uuid::now_v7());

    let err = shop.place_order(&user, positions(&[(tea.id, 1), (tea.id, 2)])).await.unwrap_err();
    assert_eq!(field_errors(err), ["positions"]);

    let err = shop.place_order(&user, positions(&[])).await.unwrap_err();
    assert_eq!(field_errors(err), ["positions"]);

    assert!(shop.list_orders(&user, &Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_rejects_non_positive_amount_and_unknown_product() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let user = Principal::user(Uuid::now_v7());

    let err = shop.place_order(&user, positions(&[(tea.id, 0)])).await.unwrap_err();
    assert_eq!(field_errors(err), ["positions[0].amount"]);

    let err = shop.place_order(&user, positions(&[(Uuid::now_v7(), 1)])).await.unwrap_err();
    assert!(matches!(err, ShopError::NotFound("product")));
}

#[tokio::test]
async fn test_order_requires_authentication() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let err = shop.place_order(&Principal::Anonymous, positions(&[(tea.id, 1)])).await.unwrap_err();
    assert!(matches!(err, ShopError::Unauthenticated));
}

#[tokio::test]
async fn test_order_update_upserts_positions() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(200)).await;
    let mug = product(&shop, "mug", cents(500)).await;
    let user = Principal::user(Uuid::now_v7());
    let order = shop.place_order(&user, positions(&[(tea.id, 1)])).await.unwrap();

    let revised = shop.revise_order(&user, order.id, patch(json!({
        "positions": [{"product_id": tea.id, "amount": 3}, {"product_id": mug.id, "amount": 1}]
    }))).await.unwrap();

    assert_eq!(revised.positions.len(), 2);
    let tea_line = revised.positions.iter().find(|l| l.product_id == tea.id).unwrap();
    assert_eq!(tea_line.amount, 3);
    assert_eq!(revised.order_sum.amount(), cents(1100));
}

#[tokio::test]
async fn test_order_update_reprices_untouched_lines() {
    let shop = shop();
    let staff = Principal::staff(Uuid::now_v7());
    let tea = product(&shop, "tea", cents(1000)).await;
    let mug = product(&shop, "mug", cents(500)).await;
    let user = Principal::user(Uuid::now_v7());
    let order = shop.place_order(&user, positions(&[(tea.id, 2)])).await.unwrap();
    assert_eq!(order.order_sum.amount(), cents(2000));

    let price_change = ProductPatch { price: Some(cents(1500)), ..Default::default() };
    shop.update_product(&staff, tea.id, price_change).await.unwrap();
    let revised = shop.revise_order(&user, order.id, patch(json!({
        "positions": [{"product_id": mug.id, "amount": 1}]
    }))).await.unwrap();

    assert_eq!(revised.order_sum.amount(), cents(3500));
}

#[tokio::test]
async fn test_only_staff_may_change_order_status() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let user = Principal::user(Uuid::now_v7());
    let staff = Principal::staff(Uuid::now_v7());
    let order = shop.place_order(&user, positions(&[(tea.id, 1)])).await.unwrap();

    let err = shop.revise_order(&user, order.id, patch(json!({"status": "DONE"}))).await.unwrap_err();
    assert_eq!(field_errors(err), ["error"]);

    let revised = shop.revise_order(&staff, order.id, patch(json!({"status": "IN_PROGRESS"}))).await.unwrap();
    assert_eq!(revised.status, OrderStatus::InProgress);
    assert_eq!(revised.order_sum.amount(), cents(100));
}

#[tokio::test]
async fn test_orders_are_hidden_from_other_users() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let owner = Principal::user(Uuid::now_v7());
    let stranger = Principal::user(Uuid::now_v7());
    let order = shop.place_order(&owner, positions(&[(tea.id, 1)])).await.unwrap();

    assert!(matches!(shop.get_order(&stranger, order.id).await, Err(ShopError::NotFound("order"))));
    assert!(matches!(shop.delete_order(&stranger, order.id).await, Err(ShopError::NotFound("order"))));
    assert!(shop.list_orders(&stranger, &Default::default()).await.unwrap().is_empty());

    let staff = Principal::staff(Uuid::now_v7());
    assert_eq!(shop.list_orders(&staff, &Default::default()).await.unwrap().len(), 1);
    shop.delete_order(&owner, order.id).await.unwrap();
    assert!(shop.list_orders(&staff, &Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_collection_rejects_duplicates_and_skips_existing_members() {
    let shop = shop();
    let staff = Principal::staff(Uuid::now_v7());
    let tea = product(&shop, "tea", cents(100)).await;
    let mug = product(&shop, "mug", cents(200)).await;

    let duplicated = CollectionPayload { title: "kitchen".into(), text: String::new(), products_list: members(&[tea.id, tea.id]) };
    let err = shop.create_collection(&staff, duplicated).await.unwrap_err();
    assert_eq!(field_errors(err), ["products_list"]);

    let payload = CollectionPayload { title: "kitchen".into(), text: String::new(), products_list: members(&[tea.id]) };
    let collection = shop.create_collection(&staff, payload).await.unwrap();

    let redundant = CollectionPatch { products_list: members(&[tea.id, mug.id, mug.id]), ..Default::default() };
    let revised = shop.revise_collection(&staff, collection.id, redundant).await.unwrap();
    let ids: Vec<Uuid> = revised.products_list.iter().map(|m| m.product_id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&tea.id) && ids.contains(&mug.id));
    assert_eq!(revised.title, "kitchen");
}

#[tokio::test]
async fn test_collections_are_staff_only_for_writes() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let payload = CollectionPayload { title: "kitchen".into(), text: String::new(), products_list: members(&[tea.id]) };

    let err = shop.create_collection(&Principal::user(Uuid::now_v7()), payload).await.unwrap_err();
    assert!(matches!(err, ShopError::Forbidden));
    assert!(shop.list_collections(&Principal::Anonymous).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_one_review_per_user_and_product() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let author = Principal::user(Uuid::now_v7());
    let review = || ReviewPayload { product: tea.id, text: "lovely".into(), rating: 5 };

    shop.create_review(&author, review()).await.unwrap();
    let err = shop.create_review(&author, review()).await.unwrap_err();
    assert_eq!(field_errors(err), ["product"]);

    shop.create_review(&Principal::user(Uuid::now_v7()), review()).await.unwrap();
    assert_eq!(shop.list_reviews(&Principal::Anonymous, &Default::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_review_edits_are_restricted() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let author = Principal::user(Uuid::now_v7());
    let review = shop.create_review(&author, ReviewPayload { product: tea.id, text: "ok".into(), rating: 3 }).await.unwrap();

    let err = shop.edit_review(&Principal::user(Uuid::now_v7()), review.id, patch(json!({"rating": 1}))).await.unwrap_err();
    assert!(matches!(err, ShopError::Forbidden));

    let err = shop.edit_review(&author, review.id, patch(json!({"product": Uuid::now_v7()}))).await.unwrap_err();
    assert_eq!(field_errors(err), ["error"]);

    let err = shop.edit_review(&author, review.id, patch(json!({"rating": 6}))).await.unwrap_err();
    assert_eq!(field_errors(err), ["rating"]);

    let edited = shop.edit_review(&author, review.id, patch(json!({"rating": 4}))).await.unwrap();
    assert_eq!(edited.rating, 4);
    assert_eq!(edited.text, "ok");
}

#[tokio::test]
async fn test_favorites_are_unique_and_private() {
    let shop = shop();
    let tea = product(&shop, "tea", cents(100)).await;
    let owner = Principal::user(Uuid::now_v7());

    let favorite = shop.add_favorite(&owner, FavoritePayload { product: tea.id }).await.unwrap();
    let err = shop.add_favorite(&owner, FavoritePayload { product: tea.id }).await.unwrap_err();
    assert_eq!(field_errors(err), ["product"]);

    let stranger = Principal::user(Uuid::now_v7());
    assert!(matches!(shop.get_favorite(&stranger, favorite.id).await, Err(ShopError::NotFound("favorite"))));
    assert!(matches!(shop.remove_favorite(&stranger, favorite.id).await, Err(ShopError::NotFound("favorite"))));
    assert!(shop.list_favorites(&stranger).await.unwrap().is_empty());
    assert_eq!(shop.list_favorites(&owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleting_a_product_cascades() {
    let shop = shop();
    let staff = Principal::staff(Uuid::now_v7());
    let tea = product(&shop, "tea", cents(100)).await;
    let mug = product(&shop, "mug", cents(400)).await;
    let user = Principal::user(Uuid::now_v7());
    let order = shop.place_order(&user, positions(&[(tea.id, 1), (mug.id, 1)])).await.unwrap();
    shop.create_review(&user, ReviewPayload { product: tea.id, text: String::new(), rating: 2 }).await.unwrap();
    shop.add_favorite(&user, FavoritePayload { product: tea.id }).await.unwrap();

    shop.delete_product(&staff, tea.id).await.unwrap();

    let order = shop.get_order(&user, order.id).await.unwrap();
    assert_eq!(order.positions.len(), 1);
    assert_eq!(order.positions[0].product_id, mug.id);
    assert!(shop.list_reviews(&user, &Default::default()).await.unwrap().is_empty());
    assert!(shop.list_favorites(&user).await.unwrap().is_empty());
    assert!(matches!(shop.get_product(&user, tea.id).await, Err(ShopError::NotFound("product"))));
}

#[tokio::test]
async fn test_collection_title_and_text_update_without_members() {
    let shop = shop();
    let staff = Principal::staff(Uuid::now_v7());
    let tea = product(&shop, "tea", cents(100)).await;
    let payload = CollectionPayload { title: "kitchen".into(), text: "pots".into(), products_list: members(&[tea.id]) };
    let collection = shop.create_collection(&staff, payload).await.unwrap();

    let retitled = CollectionPatch { title: Some("pantry".into()), ..Default::default() };
    let revised = shop.revise_collection(&staff, collection.id, retitled).await.unwrap();
    assert_eq!((revised.title.as_str(), revised.text.as_str()), ("pantry", "pots"));
    assert_eq!(revised.products_list.len(), 1);

    let described = CollectionPatch { text: Some("dry goods".into()), ..Default::default() };
    let revised = shop.revise_collection(&staff, collection.id, described).await.unwrap();
    assert_eq!((revised.title.as_str(), revised.text.as_str()), ("pantry", "dry goods"));
    assert_eq!(revised.products_list[0].product_id, tea.id);

    let blank = CollectionPatch { title: Some(String::new()), ..Default::default() };
    let err = shop.revise_collection(&staff, collection.id, blank).await.unwrap_err();
    assert_eq!(field_errors(err), ["title"]);
}

#[tokio::test]
async fn test_prices_beyond_column_precision_are_rejected() {
    let shop = shop();
    let staff = Principal::staff(Uuid::now_v7());
    let payload = ProductPayload { name: "yacht".into(), description: String::new(), price: Decimal::from(10u64.pow(18)) };
    let err = shop.create_product(&staff, payload).await.unwrap_err();
    assert_eq!(field_errors(err), ["price"]);
}

#[tokio::test]
async fn test_order_total_overflow_is_a_validation_error() {
    let shop = shop();
    let staff = Principal::staff(Uuid::now_v7());
    let user = Principal::user(Uuid::now_v7());
    let costly = product(&shop, "yacht", Decimal::new(999_999_999_999, 2)).await;

    let err = shop.place_order(&user, positions(&[(costly.id, 1_000_000)])).await.unwrap_err();
    assert_eq!(field_errors(err), ["positions"]);
    let err = shop.place_order(&user, positions(&[(costly.id, 1_000_001)])).await.unwrap_err();
    assert_eq!(field_errors(err), ["positions[0].amount"]);

    let tea = product(&shop, "tea", cents(100)).await;
    let order = shop.place_order(&user, positions(&[(tea.id, 1000)])).await.unwrap();
    let hike = ProductPatch { price: Some(Decimal::new(999_999_999_999, 2)), ..Default::default() };
    shop.update_product(&staff, tea.id, hike).await.unwrap();
    let err = shop.revise_order(&user, order.id, patch(json!({"positions": []}))).await.unwrap_err();
    assert_eq!(field_errors(err), ["positions"]);
    assert_eq!(shop.get_order(&user, order.id).await.unwrap().order_sum.amount(), cents(100_000));
}
