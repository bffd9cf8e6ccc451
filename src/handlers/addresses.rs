use axum::{extract::{rejection::JsonRejection, State}, response::Response, Json};

use crate::{
    auth::CustomerUser,
    entities::CustomerAddressModel,
    errors::ServiceError,
    handlers::common::{created_response, json_body, validate_input},
    services::customers::NewAddress,
    ApiResponse, ApiResult, AppState,
};

/// Address book of the signed-in customer, default first.
pub async fn list_addresses(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<Vec<CustomerAddressModel>> {
    let addresses = state
        .services
        .customers
        .list_addresses(&user.customer_id)
        .await?;
    Ok(Json(ApiResponse::success(addresses)))
}

pub async fn add_address(
    State(state): State<AppState>,
    user: CustomerUser,
    payload: Result<Json<NewAddress>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let input = json_body(payload)?;
    validate_input(&input)?;
    let address = state
        .services
        .customers
        .add_address(&user.customer_id, input)
        .await?;
    Ok(created_response(address))
}
