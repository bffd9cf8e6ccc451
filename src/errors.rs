use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Stable machine-readable kind, e.g. `insufficient_stock`
    pub code: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was rendered
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Payment method {0} requires a proof of payment")]
    AttachmentRequired(String),

    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::StorageFailure(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::AttachmentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientStock(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::ProductUnavailable(_) => StatusCode::GONE,
            Self::EmptyCart => StatusCode::PRECONDITION_FAILED,
            Self::InvalidAddress(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DatabaseError(_) | Self::StorageFailure(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable identifier clients can branch on; unlike the HTTP status it is unique per kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) | Self::StorageFailure(_) => "storage_failure",
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::EmptyCart => "empty_cart",
            Self::InsufficientStock(_) => "insufficient_stock",
            Self::InvalidAddress(_) => "invalid_address",
            Self::AttachmentRequired(_) => "attachment_required",
            Self::ProductUnavailable(_) => "product_unavailable",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Infrastructure errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::StorageFailure(_) => {
                "Storage temporarily unavailable".to_string()
            }
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::collections::HashSet;

    fn checkout_errors() -> Vec<ServiceError> {
        vec![
            ServiceError::EmptyCart,
            ServiceError::InvalidAddress("x".into()),
            ServiceError::AttachmentRequired("x".into()),
            ServiceError::InsufficientStock("x".into()),
            ServiceError::ProductUnavailable("x".into()),
            ServiceError::InvalidArgument("x".into()),
            ServiceError::NotFound("x".into()),
        ]
    }

    #[tokio::test]
    async fn error_response_includes_request_id_and_code() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::InsufficientStock("SKU001".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.code, "insufficient_stock");
    }

    #[test]
    fn checkout_failures_map_to_distinct_statuses() {
        let statuses: HashSet<_> = checkout_errors().iter().map(|e| e.status_code()).collect();
        assert_eq!(statuses.len(), checkout_errors().len());
    }

    #[test]
    fn every_kind_has_a_distinct_code() {
        let mut all = checkout_errors();
        all.extend([
            ServiceError::InvalidTransition("x".into()),
            ServiceError::Unauthorized("x".into()),
            ServiceError::Forbidden("x".into()),
            ServiceError::InternalError("x".into()),
            ServiceError::StorageFailure("x".into()),
        ]);
        let codes: HashSet<_> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn response_message_hides_storage_details() {
        let db = ServiceError::DatabaseError(DbErr::Custom("constraint orders_pkey".into()));
        assert_eq!(db.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!db.response_message().contains("orders_pkey"));

        let io = ServiceError::StorageFailure("/srv/uploads: permission denied".into());
        assert!(!io.response_message().contains("/srv"));

        assert_eq!(
            ServiceError::NotFound("Order ORD00001".into()).response_message(),
            "Not found: Order ORD00001"
        );
    }
}
