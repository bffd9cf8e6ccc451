use axum::{
    extract::{Multipart, State},
    response::Response,
    Json,
};
use tracing::debug;

use crate::{
    auth::CustomerUser,
    errors::ServiceError,
    handlers::common::created_response,
    services::{
        attachments::UploadedFile,
        commerce::{CheckoutRequest, OrderWithItems, PaymentMethod},
    },
    ApiResponse, ApiResult, AppState,
};

/// Form field carrying the payment proof file.
const PROOF_FIELD: &str = "proof_of_payment";

/// Checkout form after parsing, before validation.
#[derive(Debug, Default)]
struct CheckoutForm {
    shipping_address_id: Option<String>,
    payment_method: Option<String>,
    notes: Option<String>,
    proof: Option<UploadedFile>,
}

impl CheckoutForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut form = CheckoutForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::InvalidArgument(format!("Invalid multipart request: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                PROOF_FIELD => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| {
                        ServiceError::InvalidArgument(format!("Multipart error: {}", e))
                    })?;
                    // Browsers send an empty part when no file was chosen
                    if !bytes.is_empty() || !file_name.is_empty() {
                        form.proof = Some(UploadedFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                "shipping_address_id" | "payment_method" | "notes" => {
                    let value = field.text().await.map_err(|e| {
                        ServiceError::InvalidArgument(format!("Multipart error: {}", e))
                    })?;
                    match name.as_str() {
                        "shipping_address_id" => form.shipping_address_id = Some(value),
                        "payment_method" => form.payment_method = Some(value),
                        _ => form.notes = Some(value),
                    }
                }
                other => debug!(field = other, "ignoring unknown checkout field"),
            }
        }

        Ok(form)
    }

    fn into_request(self) -> Result<(CheckoutRequest, Option<UploadedFile>), ServiceError> {
        let shipping_address_id = self
            .shipping_address_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::InvalidArgument("shipping_address_id is required".to_string()))?
            .parse::<i32>()
            .map_err(|_| ServiceError::InvalidArgument("shipping_address_id must be a number".to_string()))?;

        let payment_method = PaymentMethod::parse(
            self.payment_method
                .as_deref()
                .ok_or_else(|| ServiceError::InvalidArgument("payment_method is required".to_string()))?,
        )?;

        Ok((
            CheckoutRequest {
                shipping_address_id,
                payment_method,
                notes: self.notes,
            },
            self.proof,
        ))
    }
}

/// `multipart/form-data` checkout of the signed-in customer's cart.
pub async fn checkout(
    State(state): State<AppState>,
    user: CustomerUser,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let (request, proof) = CheckoutForm::read(multipart).await?.into_request()?;
    let order = state
        .services
        .checkout
        .create_order(&user.customer_id, request, proof)
        .await?;
    Ok(created_response(order))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    user: CustomerUser,
) -> ApiResult<Vec<OrderWithItems>> {
    let orders = state
        .services
        .checkout
        .list_customer_orders(&user.customer_id)
        .await?;
    Ok(Json(ApiResponse::success(orders)))
}
