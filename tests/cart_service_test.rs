mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use storefront_checkout::{
    errors::ServiceError,
    services::{catalog::ProductUpdate, commerce::AddToCartInput},
};

fn add(sku: &str, quantity: i32) -> AddToCartInput {
    AddToCartInput {
        product_sku: sku.to_string(),
        quantity,
    }
}

#[tokio::test]
async fn adding_twice_merges_into_one_line() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("merge@example.com").await;
    app.seed_product("SKU001", dec!(100.00), 10).await;
    let cart = &app.state.services.cart;

    let first = cart
        .add_item(&customer.customer_id, add("SKU001", 2))
        .await
        .unwrap();
    let second = cart
        .add_item(&customer.customer_id, add("SKU001", 3))
        .await
        .unwrap();

    assert_eq!(first.cart_line_id, second.cart_line_id);
    assert_eq!(second.quantity, 5);

    let view = cart.list_cart(&customer.customer_id).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.total_quantity, 5);
    assert_eq!(view.grand_total, dec!(500.00));
    assert_eq!(view.lines[0].subtotal, dec!(500.00));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_accumulate_on_one_line() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("burst@example.com").await;
    app.seed_product("SKU001", dec!(10.00), 20).await;

    let adds = (0..4).map(|_| {
        let cart = app.state.services.cart.clone();
        let customer_id = customer.customer_id.clone();
        tokio::spawn(async move { cart.add_item(&customer_id, add("SKU001", 2)).await })
    });
    for added in futures::future::join_all(adds).await {
        added.expect("task panicked").expect("add to cart");
    }

    let view = app
        .state
        .services
        .cart
        .list_cart(&customer.customer_id)
        .await
        .unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.total_quantity, 8);
}

#[tokio::test]
async fn merge_refreshes_the_catalog_copy() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("reprice@example.com").await;
    app.seed_product("SKU001", dec!(10.00), 10).await;
    let cart = &app.state.services.cart;

    cart.add_item(&customer.customer_id, add("SKU001", 1))
        .await
        .unwrap();
    app.state
        .services
        .catalog
        .update_product(
            "SKU001",
            ProductUpdate {
                regular_price: Some(dec!(12.50)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let merged = cart
        .add_item(&customer.customer_id, add("SKU001", 1))
        .await
        .unwrap();
    assert_eq!(merged.quantity, 2);
    assert_eq!(merged.unit_price, dec!(12.50));
}

#[tokio::test]
async fn non_positive_quantity_counts_as_one() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("zero@example.com").await;
    app.seed_product("SKU001", dec!(10.00), 10).await;

    let line = app
        .state
        .services
        .cart
        .add_item(&customer.customer_id, add("SKU001", 0))
        .await
        .unwrap();
    assert_eq!(line.quantity, 1);
}

#[tokio::test]
async fn merged_quantity_beyond_stock_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("stock@example.com").await;
    app.seed_product("SKU001", dec!(10.00), 4).await;
    let cart = &app.state.services.cart;

    cart.add_item(&customer.customer_id, add("SKU001", 3))
        .await
        .unwrap();
    let result = cart.add_item(&customer.customer_id, add("SKU001", 2)).await;

    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
    assert_eq!(app.cart_quantity(&customer.customer_id, "SKU001").await, Some(3));
}

#[tokio::test]
async fn unknown_or_unpublished_products_cannot_be_added() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("missing@example.com").await;
    app.seed_product("SKU002", dec!(10.00), 4).await;
    app.state
        .services
        .catalog
        .update_product(
            "SKU002",
            ProductUpdate {
                status: Some(storefront_checkout::entities::ProductStatus::Unpublished),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let cart = &app.state.services.cart;

    assert_matches!(
        cart.add_item(&customer.customer_id, add("NOPE", 1)).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        cart.add_item(&customer.customer_id, add("SKU002", 1)).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn lines_belong_to_their_owner() {
    let app = TestApp::new().await;
    let owner = app.seed_customer("owner@example.com").await;
    let other = app.seed_customer("other@example.com").await;
    app.seed_product("SKU001", dec!(10.00), 10).await;
    let cart = &app.state.services.cart;

    let line = cart
        .add_item(&owner.customer_id, add("SKU001", 1))
        .await
        .unwrap();

    assert_matches!(
        cart.update_quantity(&other.customer_id, line.cart_line_id, 2).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        cart.remove_item(&other.customer_id, line.cart_line_id).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(cart.list_cart(&other.customer_id).await.unwrap().lines.is_empty());
    assert_eq!(app.cart_quantity(&owner.customer_id, "SKU001").await, Some(1));
}

#[tokio::test]
async fn update_quantity_validates_and_refreshes_price() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("update@example.com").await;
    app.seed_product("SKU001", dec!(10.00), 5).await;
    let cart = &app.state.services.cart;

    let line = cart
        .add_item(&customer.customer_id, add("SKU001", 1))
        .await
        .unwrap();

    assert_matches!(
        cart.update_quantity(&customer.customer_id, line.cart_line_id, 0).await,
        Err(ServiceError::InvalidArgument(_))
    );
    assert_matches!(
        cart.update_quantity(&customer.customer_id, line.cart_line_id, 6).await,
        Err(ServiceError::InsufficientStock(_))
    );

    app.state
        .services
        .catalog
        .update_product(
            "SKU001",
            ProductUpdate {
                regular_price: Some(dec!(12.50)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let updated = cart
        .update_quantity(&customer.customer_id, line.cart_line_id, 2)
        .await
        .unwrap();
    assert_eq!(updated.quantity, 2);
    assert_eq!(updated.unit_price, dec!(12.50));
}

#[tokio::test]
async fn remove_deletes_the_line() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("remove@example.com").await;
    app.seed_product("SKU001", dec!(10.00), 5).await;
    app.seed_product("SKU002", dec!(20.00), 5).await;
    let cart = &app.state.services.cart;

    let first = cart
        .add_item(&customer.customer_id, add("SKU001", 1))
        .await
        .unwrap();
    cart.add_item(&customer.customer_id, add("SKU002", 2))
        .await
        .unwrap();

    cart.remove_item(&customer.customer_id, first.cart_line_id)
        .await
        .unwrap();

    let view = cart.list_cart(&customer.customer_id).await.unwrap();
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].line.product_sku, "SKU002");
    assert_eq!(view.grand_total, dec!(40.00));

    assert_matches!(
        cart.remove_item(&customer.customer_id, first.cart_line_id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn unknown_customer_cannot_add() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(10.00), 5).await;

    assert_matches!(
        app.state
            .services
            .cart
            .add_item("CST9999999999", add("SKU001", 1))
            .await,
        Err(ServiceError::NotFound(_))
    );
}
