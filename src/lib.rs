//! Storefront checkout service
//!
//! Cart, checkout and order lifecycle for the storefront back office.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Headroom for multipart framing around the attachment itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config, Arc::new(event_sender.clone()));
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Customer and admin routes, without middleware.
pub fn api_routes(config: &config::AppConfig) -> Router<AppState> {
    let upload_limit = config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let user = Router::new()
        .route(
            "/addresses",
            get(handlers::addresses::list_addresses).post(handlers::addresses::add_address),
        )
        .route(
            "/cart",
            get(handlers::carts::get_cart).post(handlers::carts::add_to_cart),
        )
        .route(
            "/cart/{cart_line_id}",
            put(handlers::carts::update_cart_line).delete(handlers::carts::remove_cart_line),
        )
        .route(
            "/orders",
            get(handlers::orders::list_my_orders)
                .post(handlers::orders::checkout)
                .layer(DefaultBodyLimit::max(upload_limit)),
        );

    let admin = Router::new()
        .route("/products", axum::routing::post(handlers::admin_products::create_product))
        .route("/products/{sku}", put(handlers::admin_products::update_product))
        .route("/orders", get(handlers::admin_orders::list_orders))
        .route(
            "/orders/{order_id}",
            get(handlers::admin_orders::get_order)
                .put(handlers::admin_orders::update_order_status)
                .delete(handlers::admin_orders::delete_order),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/user", user)
        .nest("/admin", admin)
}

/// The full application: API routes, uploaded files and the request-id and
/// tracing layers. CORS is added by the binary.
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    api_routes(&state.config)
        .nest_service("/uploads", uploads)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
