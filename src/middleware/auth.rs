use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Access token required")]
    MissingCredential,

    #[error("Invalid authorization scheme")]
    InvalidScheme,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    ExpiredToken,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential | AuthError::InvalidScheme => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken | AuthError::ExpiredToken => StatusCode::FORBIDDEN,
        }
    }
}

/// Customer identity resolved from a bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthCustomer {
    pub customer_id: Uuid,
}

/// Resolve a raw token to the customer it was issued for.
pub fn resolve_customer(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })?;

    Uuid::parse_str(&decoded.claims.sub).map_err(|_| AuthError::InvalidToken)
}

/// Pull the token out of an `Authorization` header value.
pub fn bearer_token(header_value: Option<&str>) -> Result<&str, AuthError> {
    let value = header_value.ok_or(AuthError::MissingCredential)?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

impl FromRequestParts<AppState> for AuthCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidScheme)?),
            None => None,
        };
        let token = bearer_token(header_value)?;
        let customer_id = resolve_customer(token, &state.config.jwt_secret)?;

        Ok(AuthCustomer { customer_id })
    }
}
