mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::DatabaseTransaction;
use storefront_checkout::{
    errors::ServiceError,
    services::{
        attachments::UploadedFile,
        catalog::{CatalogEntry, CatalogReader, ProductUpdate, SeaOrmCatalog},
        commerce::{AddToCartInput, CheckoutRequest, CheckoutService, PaymentMethod},
    },
};

/// Reports plenty of stock whatever the table says, like a read taken just
/// before another checkout committed.
struct StaleCatalog;

#[async_trait]
impl CatalogReader for StaleCatalog {
    async fn lookup(
        &self,
        txn: &DatabaseTransaction,
        sku: &str,
    ) -> Result<Option<CatalogEntry>, ServiceError> {
        Ok(SeaOrmCatalog
            .lookup(txn, sku)
            .await?
            .map(|entry| CatalogEntry { stock: 999, ..entry }))
    }
}

// Many customers race for the last units of one SKU; stock never goes negative
// and exactly as many orders succeed as there were units.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(50.00), 10).await;

    let mut shoppers = Vec::new();
    for n in 0..6 {
        let customer = app.seed_customer(&format!("racer{}@example.com", n)).await;
        let address = app.seed_address(&customer.customer_id).await;
        app.state
            .services
            .cart
            .add_item(
                &customer.customer_id,
                AddToCartInput {
                    product_sku: "SKU001".to_string(),
                    quantity: 2,
                },
            )
            .await
            .expect("fill cart");
        shoppers.push((customer.customer_id, address.address_id));
    }

    // Stock 10, quantity 2 each: five can win, the sixth must lose.
    let mut tasks = vec![];
    for (customer_id, address_id) in shoppers {
        let checkout = app.state.services.checkout.clone();
        tasks.push(tokio::spawn(async move {
            checkout
                .create_order(
                    &customer_id,
                    CheckoutRequest {
                        shipping_address_id: address_id,
                        payment_method: PaymentMethod::CashOnDelivery,
                        notes: None,
                    },
                    None,
                )
                .await
        }));
    }

    let mut placed = 0;
    let mut sold_out = 0;
    for task in tasks {
        match task.await.expect("task panicked") {
            Ok(_) => placed += 1,
            Err(ServiceError::InsufficientStock(_)) => sold_out += 1,
            Err(other) => panic!("unexpected checkout failure: {other}"),
        }
    }

    assert_eq!(placed, 5, "exactly five checkouts should succeed");
    assert_eq!(sold_out, 1);
    assert_eq!(app.stock_of("SKU001").await, 0);
    assert_eq!(app.order_count().await, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_unit_goes_to_exactly_one_customer() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(50.00), 1).await;

    let mut shoppers = Vec::new();
    for email in ["first@example.com", "second@example.com"] {
        let customer = app.seed_customer(email).await;
        let address = app.seed_address(&customer.customer_id).await;
        app.state
            .services
            .cart
            .add_item(
                &customer.customer_id,
                AddToCartInput {
                    product_sku: "SKU001".to_string(),
                    quantity: 1,
                },
            )
            .await
            .expect("fill cart");
        shoppers.push((customer.customer_id, address.address_id));
    }

    let results = futures::future::join_all(shoppers.into_iter().map(|(customer_id, address_id)| {
        let checkout = app.state.services.checkout.clone();
        async move {
            checkout
                .create_order(
                    &customer_id,
                    CheckoutRequest {
                        shipping_address_id: address_id,
                        payment_method: PaymentMethod::CashOnDelivery,
                        notes: None,
                    },
                    None,
                )
                .await
        }
    }))
    .await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(ServiceError::InsufficientStock(_)))));
    assert_eq!(app.stock_of("SKU001").await, 0);
}

// Stock vanishes between the catalog read and the decrement: the conditional
// update on the second line matches nothing and the first line's decrement
// is rolled back with it.
#[tokio::test]
async fn decrement_miss_rolls_back_earlier_lines() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("stale@example.com").await;
    let address = app.seed_address(&customer.customer_id).await;
    app.seed_product("SKU001", dec!(100.00), 5).await;
    app.seed_product("SKU002", dec!(20.00), 5).await;

    let cart = &app.state.services.cart;
    for (sku, quantity) in [("SKU001", 2), ("SKU002", 4)] {
        cart.add_item(
            &customer.customer_id,
            AddToCartInput {
                product_sku: sku.to_string(),
                quantity,
            },
        )
        .await
        .expect("add to cart");
    }
    app.state
        .services
        .catalog
        .update_product(
            "SKU002",
            ProductUpdate {
                stock: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let checkout = CheckoutService::new(
        app.state.db.clone(),
        Arc::new(StaleCatalog),
        Arc::new(app.attachment_store()),
        Arc::new(app.state.event_sender.clone()),
    );
    let result = checkout
        .create_order(
            &customer.customer_id,
            CheckoutRequest {
                shipping_address_id: address.address_id,
                payment_method: PaymentMethod::ManualTransferBca,
                notes: None,
            },
            Some(UploadedFile::new("receipt.png", b"\x89PNG".to_vec())),
        )
        .await;

    assert_matches!(result, Err(ServiceError::InsufficientStock(msg)) if msg.contains("SKU002"));
    assert_eq!(app.stock_of("SKU001").await, 5);
    assert_eq!(app.stock_of("SKU002").await, 3);
    assert_eq!(app.order_count().await, 0);
    assert_eq!(app.cart_quantity(&customer.customer_id, "SKU001").await, Some(2));
    assert_eq!(app.cart_quantity(&customer.customer_id, "SKU002").await, Some(4));
    assert!(app.wait_for_proofs(0).await.is_empty());
}
