use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{AuthResponse, Claims, LoginRequest, RegisterRequest},
    error::{AppError, AppResult},
    models::{Customer, CustomerProfile},
    response::{ApiResponse, Meta},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn issue_token(
    customer_id: Uuid,
    email: &str,
    secret: &str,
    ttl_hours: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: customer_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    Ok(email)
}

async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(AppError::Internal)
}

async fn verify_password(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|_| anyhow::anyhow!("Invalid password hash"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(AppError::Internal)
}

pub async fn register_customer(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let RegisterRequest {
        email,
        password,
        first_name,
        last_name,
        phone,
    } = payload;

    let email = normalize_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(AppError::Validation("First and last name are required".into()));
    }

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM customers WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(password).await?;

    let customer: Customer = sqlx::query_as(
        r#"
        INSERT INTO customers (id, email, password_hash, first_name, last_name, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.as_str())
    .bind(password_hash)
    .bind(first_name.trim())
    .bind(last_name.trim())
    .bind(phone.filter(|p| !p.trim().is_empty()))
    .fetch_one(&state.pool)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Email already registered".into())
        }
        other => AppError::DbError(other),
    })?;

    let token = issue_token(
        customer.id,
        &customer.email,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    audit::record(
        &state.pool,
        Some(customer.id),
        "customer_register",
        "customers",
        serde_json::json!({ "customer_id": customer.id }),
    )
    .await;
    tracing::info!(customer_id = %customer.id, "customer registered");

    Ok(ApiResponse::success(
        "Registration successful",
        AuthResponse {
            token,
            customer: CustomerProfile::from(&customer),
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_customer(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let LoginRequest { email, password } = payload;
    let email = email.trim().to_lowercase();

    let customer: Option<Customer> =
        sqlx::query_as("SELECT * FROM customers WHERE email = $1 AND is_active = TRUE")
            .bind(email.as_str())
            .fetch_optional(&state.pool)
            .await?;

    let customer = match customer {
        Some(c) => c,
        None => return Err(AppError::Unauthorized),
    };

    if !verify_password(password, customer.password_hash.clone()).await? {
        return Err(AppError::Unauthorized);
    }

    sqlx::query("UPDATE customers SET last_login = now() WHERE id = $1")
        .bind(customer.id)
        .execute(&state.pool)
        .await?;

    let token = issue_token(
        customer.id,
        &customer.email,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    audit::record(
        &state.pool,
        Some(customer.id),
        "customer_login",
        "customers",
        serde_json::json!({ "customer_id": customer.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        AuthResponse {
            token,
            customer: CustomerProfile::from(&customer),
        },
        Some(Meta::empty()),
    ))
}
