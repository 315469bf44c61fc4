mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::IntoResponse,
};
use maple_store_api::{
    app::build_app,
    error::AppError,
    middleware::auth::{AuthError, bearer_token, resolve_customer},
    services::auth_service::{issue_token, normalize_email},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use common::{TEST_SECRET, offline_state};

async fn json_body(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[test]
fn issued_token_resolves_to_customer() {
    let customer_id = Uuid::new_v4();
    let token = issue_token(customer_id, "anne@example.test", TEST_SECRET, 1).unwrap();

    assert_eq!(resolve_customer(&token, TEST_SECRET), Ok(customer_id));
}

#[test]
fn token_signed_with_other_secret_is_invalid() {
    let token = issue_token(Uuid::new_v4(), "anne@example.test", "another-secret", 1).unwrap();

    assert_eq!(
        resolve_customer(&token, TEST_SECRET),
        Err(AuthError::InvalidToken)
    );
}

#[test]
fn expired_token_is_rejected() {
    let token = issue_token(Uuid::new_v4(), "anne@example.test", TEST_SECRET, -1).unwrap();

    assert_eq!(
        resolve_customer(&token, TEST_SECRET),
        Err(AuthError::ExpiredToken)
    );
    assert_eq!(AuthError::ExpiredToken.status(), StatusCode::FORBIDDEN);
}

#[test]
fn bearer_header_parsing() {
    assert_eq!(bearer_token(None), Err(AuthError::MissingCredential));
    assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::InvalidScheme));
    assert_eq!(bearer_token(Some("Bearer   ")), Err(AuthError::MissingCredential));
    assert_eq!(bearer_token(Some("Bearer abc.def")), Ok("abc.def"));
}

#[test]
fn emails_are_normalized() {
    assert_eq!(
        normalize_email("  Anne@Example.CA ").unwrap(),
        "anne@example.ca"
    );
    assert!(normalize_email("not-an-email").is_err());
    assert!(normalize_email("a@b").is_err());
}

#[tokio::test]
async fn cart_without_credential_is_unauthorized() -> anyhow::Result<()> {
    let app = build_app(offline_state())?;

    let response = app
        .oneshot(Request::builder().uri("/api/cart").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn checkout_with_bad_token_is_forbidden() -> anyhow::Result<()> {
    let app = build_app(offline_state())?;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn unknown_route_gets_failure_envelope() -> anyhow::Result<()> {
    let app = build_app(offline_state())?;

    let response = app
        .oneshot(Request::builder().uri("/api/nowhere").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn shortfall_is_reported_in_error_details() -> anyhow::Result<()> {
    let product_id = Uuid::new_v4();
    let response = AppError::InsufficientStock {
        product_id,
        product_name: "Maple Syrup".into(),
        requested: 5,
        available: 2,
    }
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["error"]["details"]["productId"], product_id.to_string());
    assert_eq!(body["error"]["details"]["shortfall"], 3);
    Ok(())
}

#[tokio::test]
async fn aborted_transaction_hides_cause() -> anyhow::Result<()> {
    let err = AppError::DbError(sqlx::Error::PoolTimedOut).into_aborted();
    assert!(matches!(err, AppError::TransactionAborted(_)));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await?;
    assert_eq!(body["message"], "Failed to create order");
    assert_eq!(body["error"]["code"], "TRANSACTION_ABORTED");
    Ok(())
}

#[test]
fn business_errors_survive_abort_conversion() {
    assert!(matches!(AppError::EmptyCart.into_aborted(), AppError::EmptyCart));
    assert!(matches!(
        AppError::CustomerNotFound.into_aborted(),
        AppError::CustomerNotFound
    ));
}
