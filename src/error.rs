use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    middleware::auth::AuthError,
    response::{ApiResponse, ErrorBody},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        product_name: String,
        requested: i32,
        available: i32,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Invalid email or password")]
    Unauthorized,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Conflict(String),

    #[error("Order transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::CustomerNotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InsufficientStock { .. } | AppError::EmptyCart => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Auth(err) => err.status(),
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TransactionAborted(_)
            | AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::EmptyCart => "EMPTY_CART",
            AppError::CustomerNotFound => "CUSTOMER_NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Auth(err) => {
                if err.status() == StatusCode::UNAUTHORIZED {
                    "UNAUTHORIZED"
                } else {
                    "FORBIDDEN"
                }
            }
            AppError::Conflict(_) => "CONFLICT",
            AppError::TransactionAborted(_) => "TRANSACTION_ABORTED",
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Message safe to hand back to a caller.
    pub fn public_message(&self) -> String {
        match self {
            AppError::TransactionAborted(_) => "Failed to create order".to_string(),
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::InsufficientStock {
                product_id,
                product_name,
                requested,
                available,
            } => Some(serde_json::json!({
                "productId": product_id,
                "productName": product_name,
                "requested": requested,
                "available": available,
                "shortfall": requested - available,
            })),
            _ => None,
        }
    }

    /// Storage failures become `TransactionAborted`; business errors pass through.
    pub fn into_aborted(self) -> Self {
        match self {
            AppError::DbError(err) => AppError::TransactionAborted(err.to_string()),
            AppError::OrmError(err) => AppError::TransactionAborted(err.to_string()),
            AppError::Internal(err) => AppError::TransactionAborted(err.to_string()),
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                AppError::DbError(err) => tracing::error!(error = ?err, "database error"),
                AppError::OrmError(err) => tracing::error!(error = ?err, "orm error"),
                AppError::Internal(err) => tracing::error!(error = ?err, "internal error"),
                other => tracing::error!(error = %other, "request failed"),
            }
        }

        let message = self.public_message();
        let body = ApiResponse::failure(
            message.clone(),
            ErrorBody {
                code: self.code().to_string(),
                message,
                details: self.details(),
            },
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
