mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use storefront_checkout::{
    entities::OrderStatus,
    errors::ServiceError,
    services::{
        attachments::UploadedFile,
        commerce::{AddToCartInput, CheckoutRequest, OrderWithItems, PaymentMethod},
    },
};

async fn place_order(app: &TestApp, email: &str, with_proof: bool) -> OrderWithItems {
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

    let (payment_method, proof) = if with_proof {
        (
            PaymentMethod::ManualTransferBca,
            Some(UploadedFile::new("receipt.pdf", b"%PDF-1.4".to_vec())),
        )
    } else {
        (PaymentMethod::CashOnDelivery, None)
    };

    app.state
        .services
        .checkout
        .create_order(
            &customer.customer_id,
            CheckoutRequest {
                shipping_address_id: address.address_id,
                payment_method,
                notes: None,
            },
            proof,
        )
        .await
        .expect("checkout")
}

#[tokio::test]
async fn order_walks_the_happy_path() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(10.00), 10).await;
    let order = place_order(&app, "happy@example.com", false).await.order;
    let statuses = &app.state.services.order_status;

    for next in ["Processed", "shipped", "Completed"] {
        statuses.update_status(&order.order_id, next).await.unwrap();
    }

    let reloaded = app
        .state
        .services
        .checkout
        .get_order(&order.order_id)
        .await
        .unwrap();
    assert_eq!(reloaded.order.order_status, OrderStatus::Completed);
    assert_eq!(reloaded.order.grand_total, order.grand_total);
    assert_eq!(reloaded.order.shipping_address_snapshot, order.shipping_address_snapshot);
}

#[tokio::test]
async fn illegal_transitions_are_rejected() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(10.00), 10).await;
    let order = place_order(&app, "illegal@example.com", false).await.order;
    let statuses = &app.state.services.order_status;

    assert_matches!(
        statuses.update_status(&order.order_id, "Shipped").await,
        Err(ServiceError::InvalidTransition(_))
    );
    assert_matches!(
        statuses.update_status(&order.order_id, "Pending").await,
        Err(ServiceError::InvalidTransition(_))
    );

    statuses.update_status(&order.order_id, "Canceled").await.unwrap();
    assert_matches!(
        statuses.update_status(&order.order_id, "Processed").await,
        Err(ServiceError::InvalidTransition(_))
    );
}

#[tokio::test]
async fn unknown_status_and_order_are_reported() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(10.00), 10).await;
    let order = place_order(&app, "unknown@example.com", false).await.order;
    let statuses = &app.state.services.order_status;

    assert_matches!(
        statuses.update_status(&order.order_id, "Delivered").await,
        Err(ServiceError::InvalidArgument(_))
    );
    assert_matches!(
        statuses.update_status("ORD99999", "Processed").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn status_filter_narrows_the_admin_listing() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(10.00), 10).await;
    let first = place_order(&app, "first@example.com", false).await.order;
    let second = place_order(&app, "second@example.com", false).await.order;
    let statuses = &app.state.services.order_status;

    statuses.update_status(&first.order_id, "Processed").await.unwrap();

    let all = statuses.list_orders(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].order_id, second.order_id);

    let pending = statuses.list_orders(Some(OrderStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].order_id, second.order_id);
}

#[tokio::test]
async fn deleting_an_order_removes_items_and_proof() {
    let app = TestApp::new().await;
    app.seed_product("SKU001", dec!(10.00), 10).await;
    let order = place_order(&app, "delete@example.com", true).await.order;
    let proof = order.proof_of_payment.clone().expect("proof stored");
    assert!(app.upload_dir.join(&proof).exists());

    app.state
        .services
        .order_status
        .delete_order(&order.order_id)
        .await
        .unwrap();

    assert_eq!(app.order_count().await, 0);
    assert_eq!(app.order_item_count().await, 0);
    assert!(!app.upload_dir.join(&proof).exists());
    // Stock is not restored on deletion.
    assert_eq!(app.stock_of("SKU001").await, 9);

    assert_matches!(
        app.state
            .services
            .order_status
            .delete_order(&order.order_id)
            .await,
        Err(ServiceError::NotFound(_))
    );
}
