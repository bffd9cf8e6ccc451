use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};

use crate::{
    auth::CustomerUser,
    entities::CartLineModel,
    errors::ServiceError,
    handlers::common::{created_response, json_body},
    services::commerce::{AddToCartInput, CartView, UpdateQuantityInput},
    ApiResponse, ApiResult, AppState,
};

pub async fn get_cart(State(state): State<AppState>, user: CustomerUser) -> ApiResult<CartView> {
    let cart = state.services.cart.list_cart(&user.customer_id).await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// Adds a SKU or merges into the existing line for it.
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: CustomerUser,
    payload: Result<Json<AddToCartInput>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let input = json_body(payload)?;
    let line = state
        .services
        .cart
        .add_item(&user.customer_id, input)
        .await?;
    Ok(created_response(line))
}

pub async fn update_cart_line(
    State(state): State<AppState>,
    user: CustomerUser,
    Path(cart_line_id): Path<i32>,
    payload: Result<Json<UpdateQuantityInput>, JsonRejection>,
) -> ApiResult<CartLineModel> {
    let input = json_body(payload)?;
    let line = state
        .services
        .cart
        .update_quantity(&user.customer_id, cart_line_id, input.quantity)
        .await?;
    Ok(Json(ApiResponse::success(line)))
}

pub async fn remove_cart_line(
    State(state): State<AppState>,
    user: CustomerUser,
    Path(cart_line_id): Path<i32>,
) -> ApiResult<()> {
    state
        .services
        .cart
        .remove_item(&user.customer_id, cart_line_id)
        .await?;
    Ok(Json(ApiResponse::message("Cart line removed")))
}
