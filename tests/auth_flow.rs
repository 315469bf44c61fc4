mod common;

use maple_store_api::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppError,
    middleware::auth::resolve_customer,
    services::auth_service::{login_customer, register_customer},
};
use uuid::Uuid;

use common::{TEST_SECRET, setup_state};

fn registration(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        first_name: "Gilbert".into(),
        last_name: "Blythe".into(),
        phone: None,
    }
}

#[tokio::test]
async fn register_then_login() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let email = format!("{}@Example.test", Uuid::new_v4().simple());

    let registered = register_customer(&state, registration(&email, "avonlea-1908"))
        .await?
        .data
        .expect("auth");
    assert_eq!(registered.customer.email, email.to_lowercase());
    assert_eq!(
        resolve_customer(&registered.token, TEST_SECRET),
        Ok(registered.customer.id)
    );

    let err = register_customer(&state, registration(&email, "another-pass"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = login_customer(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "wrong-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    let logged_in = login_customer(
        &state,
        LoginRequest {
            email: email.clone(),
            password: "avonlea-1908".into(),
        },
    )
    .await?
    .data
    .expect("auth");
    assert_eq!(logged_in.customer.id, registered.customer.id);

    let (last_login,): (Option<chrono::DateTime<chrono::Utc>>,) =
        sqlx::query_as("SELECT last_login FROM customers WHERE id = $1")
            .bind(registered.customer.id)
            .fetch_one(&state.pool)
            .await?;
    assert!(last_login.is_some());
    Ok(())
}

#[tokio::test]
async fn weak_registrations_are_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let err = register_customer(&state, registration("short@example.test", "short"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = register_customer(&state, registration("no-at-sign", "long-enough-pass"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn unknown_email_cannot_log_in() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let err = login_customer(
        &state,
        LoginRequest {
            email: format!("{}@example.test", Uuid::new_v4()),
            password: "whatever-pass".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
    Ok(())
}
