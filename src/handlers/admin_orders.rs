use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::AdminUser,
    entities::OrderModel,
    handlers::common::json_body,
    services::{commerce::OrderWithItems, order_status::OrderStatusService},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// All orders, newest first, optionally narrowed by `?status=`.
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<OrderModel>> {
    let filter = OrderStatusService::parse_filter(query.status.as_deref())?;
    let orders = state.services.order_status.list_orders(filter).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_id): Path<String>,
) -> ApiResult<OrderWithItems> {
    let order = state.services.checkout.get_order(&order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(order_id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<OrderModel> {
    let body = json_body(payload)?;
    let order = state
        .services
        .order_status
        .update_status(&order_id, &body.status)
        .await?;
    info!(admin = %admin.username, %order_id, status = %order.order_status, "order status set");
    Ok(Json(ApiResponse::success(order)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(order_id): Path<String>,
) -> ApiResult<()> {
    state.services.order_status.delete_order(&order_id).await?;
    info!(admin = %admin.username, %order_id, "order deleted");
    Ok(Json(ApiResponse::message("Order deleted")))
}
