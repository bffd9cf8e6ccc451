#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::Value;
use storefront_checkout::{
    auth::{Claims, ADMIN_ROLE, CUSTOMER_ROLE},
    build_router,
    config::AppConfig,
    db::{self, DbPool},
    entities::{
        cart_line, product, product_image, CartLine, CustomerAddressModel, CustomerModel, Order,
        OrderItem, Product, ProductModel, ProductStatus,
    },
    events::{self, EventSender},
    services::{
        attachments::{LocalAttachmentStore, PAYMENT_PROOF_DIR},
        customers::{NewAddress, NewCustomer},
    },
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const CUSTOMER_SECRET: &str = "customer_secret_key_for_tests_only_0123456789";
pub const ADMIN_SECRET: &str = "admin_secret_key_for_tests_only_9876543210";
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024;

const BOUNDARY: &str = "storefront-test-boundary";

/// Application state over a throwaway SQLite file and upload directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub upload_dir: PathBuf,
    _tmp: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("temp dir");
        let db_path = tmp.path().join("storefront_test.db");
        let upload_dir = tmp.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("upload dir");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            CUSTOMER_SECRET.to_string(),
            ADMIN_SECRET.to_string(),
            "test".to_string(),
        );
        // One connection: SQLite allows a single writer anyway.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.upload_dir = upload_dir.clone();
        cfg.max_upload_bytes = MAX_UPLOAD_BYTES;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = EventSender::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            upload_dir,
            _tmp: tmp,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.state.db
    }

    pub fn attachment_store(&self) -> LocalAttachmentStore {
        LocalAttachmentStore::new(self.upload_dir.clone(), MAX_UPLOAD_BYTES)
    }

    pub fn customer_token(&self, customer_id: &str) -> String {
        mint(customer_id, CUSTOMER_ROLE, CUSTOMER_SECRET)
    }

    pub fn admin_token(&self) -> String {
        mint("backoffice", ADMIN_ROLE, ADMIN_SECRET)
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a `multipart/form-data` POST with text fields and an optional file.
    pub async fn multipart(
        &self,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> Response {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((name, file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("failed to build multipart request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_customer(&self, email: &str) -> CustomerModel {
        self.state
            .services
            .customers
            .register(NewCustomer {
                first_name: "Sari".to_string(),
                last_name: "Dewi".to_string(),
                email: email.to_string(),
                phone: Some("081234567890".to_string()),
            })
            .await
            .expect("seed customer")
    }

    pub async fn seed_address(&self, customer_id: &str) -> CustomerAddressModel {
        self.state
            .services
            .customers
            .add_address(
                customer_id,
                NewAddress {
                    title: "Home".to_string(),
                    street: "Jl. Merdeka 10".to_string(),
                    additional: None,
                    district_city: "Bandung".to_string(),
                    province: "Jawa Barat".to_string(),
                    post_code: "40111".to_string(),
                    is_default: true,
                },
            )
            .await
            .expect("seed address")
    }

    /// Inserts a published product under a fixed SKU.
    pub async fn seed_product(&self, sku: &str, price: Decimal, stock: i32) -> ProductModel {
        let now = Utc::now();
        let product = product::ActiveModel {
            sku: Set(sku.to_string()),
            title: Set(format!("Product {}", sku)),
            regular_price: Set(price),
            stock: Set(stock),
            status: Set(ProductStatus::Published),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed product");

        product_image::ActiveModel {
            product_sku: Set(sku.to_string()),
            image: Set(format!("products/{}.png", sku.to_lowercase())),
            position: Set(0),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed product image");

        product
    }

    pub async fn stock_of(&self, sku: &str) -> i32 {
        Product::find_by_id(sku.to_string())
            .one(self.db())
            .await
            .expect("query product")
            .expect("product exists")
            .stock
    }

    pub async fn cart_quantity(&self, customer_id: &str, sku: &str) -> Option<i32> {
        CartLine::find()
            .filter(cart_line::Column::CustomerId.eq(customer_id))
            .filter(cart_line::Column::ProductSku.eq(sku))
            .one(self.db())
            .await
            .expect("query cart")
            .map(|line| line.quantity)
    }

    pub async fn order_count(&self) -> u64 {
        Order::find().count(self.db()).await.expect("count orders")
    }

    pub async fn order_item_count(&self) -> u64 {
        OrderItem::find().count(self.db()).await.expect("count order items")
    }

    /// Every file currently stored under the payment-proof directory.
    pub fn stored_proofs(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(&self.upload_dir.join(PAYMENT_PROOF_DIR), &mut found);
        found
    }

    /// Waits for detached compensation tasks to settle.
    pub async fn wait_for_proofs(&self, expected: usize) -> Vec<PathBuf> {
        for _ in 0..50 {
            let files = self.stored_proofs();
            if files.len() == expected {
                return files;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        self.stored_proofs()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn mint(sub: &str, role: &str, secret: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode token")
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn collect_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, found);
        } else {
            found.push(path);
        }
    }
}
