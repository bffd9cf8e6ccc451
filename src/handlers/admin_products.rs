use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};

use crate::{
    auth::AdminUser,
    entities::ProductModel,
    errors::ServiceError,
    handlers::common::{created_response, json_body},
    services::catalog::{NewProduct, ProductUpdate},
    ApiResponse, ApiResult, AppState,
};

pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let input = json_body(payload)?;
    let product = state.services.catalog.create_product(input).await?;
    Ok(created_response(product))
}

/// Catalog edits never reach existing orders; those keep their snapshots.
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(sku): Path<String>,
    payload: Result<Json<ProductUpdate>, JsonRejection>,
) -> ApiResult<ProductModel> {
    let input = json_body(payload)?;
    let product = state.services.catalog.update_product(&sku, input).await?;
    Ok(Json(ApiResponse::success(product)))
}
