/*!
 * # Authentication boundary
 *
 * Tokens are issued elsewhere; this service only verifies them. Customers and
 * administrators sign with separate HS256 secrets, and each extractor checks
 * both the signature and the `role` claim.
 */

use crate::{errors::ServiceError, AppState};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CUSTOMER_ROLE: &str = "customer";
pub const ADMIN_ROLE: &str = "admin";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Customer id or admin username
    pub role: String, // "customer" or "admin"
    pub exp: usize,   // Expiration time
}

/// Authenticated storefront customer.
#[derive(Debug, Clone)]
pub struct CustomerUser {
    pub customer_id: String,
}

/// Authenticated back-office user.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
}

/// Pulls the token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, ServiceError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ServiceError::Unauthorized("Missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| ServiceError::Unauthorized("Malformed authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("Expected a bearer token".to_string()))
}

/// Verifies signature and expiry, then requires `role`.
pub fn validate_token(token: &str, secret: &str, role: &str) -> Result<Claims, ServiceError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!(error = %e, "token rejected");
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid token".to_string()),
        }
    })?
    .claims;

    if claims.role != role {
        return Err(ServiceError::Forbidden(format!(
            "This endpoint requires the {} role",
            role
        )));
    }
    if claims.sub.trim().is_empty() {
        return Err(ServiceError::Unauthorized("Token has no subject".to_string()));
    }
    Ok(claims)
}

impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = validate_token(token, &state.config.jwt_secret, CUSTOMER_ROLE)?;
        Ok(CustomerUser {
            customer_id: claims.sub,
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = validate_token(token, &state.config.admin_jwt_secret, ADMIN_ROLE)?;
        Ok(AdminUser {
            username: claims.sub,
        })
    }
}
