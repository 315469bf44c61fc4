use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartSummary, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthCustomer,
    models::{CartItem, CartLine},
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct StockRow {
    name: String,
    stock_quantity: i32,
    is_active: bool,
}

/// Aggregate cart lines into the subtotal and item count shown to the customer.
pub fn summarize_cart(items: Vec<CartLine>) -> CartSummary {
    let subtotal: Decimal = items.iter().map(|line| line.line_total).sum();
    let item_count: i64 = items.iter().map(|line| i64::from(line.quantity)).sum();
    CartSummary {
        items,
        subtotal: format!("{:.2}", subtotal.round_dp(2)),
        item_count,
    }
}

fn check_stock(product_id: Uuid, row: &StockRow, requested: i32) -> AppResult<()> {
    let available = if row.is_active { row.stock_quantity } else { 0 };
    if requested > available {
        return Err(AppError::InsufficientStock {
            product_id,
            product_name: row.name.clone(),
            requested,
            available,
        });
    }
    Ok(())
}

fn map_cart_write_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(db_err)
            if db_err.constraint() == Some("cart_items_customer_id_fkey") =>
        {
            AppError::CustomerNotFound
        }
        sqlx::Error::Database(db_err)
            if db_err.constraint() == Some("cart_items_product_id_fkey") =>
        {
            AppError::NotFound("Product")
        }
        other => AppError::DbError(other),
    }
}

pub async fn get_cart(pool: &DbPool, customer: &AuthCustomer) -> AppResult<ApiResponse<CartSummary>> {
    let items = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.id AS cart_item_id,
               p.id AS product_id,
               p.name AS product_name,
               p.image_emoji,
               ci.quantity,
               COALESCE(p.sale_price, p.price) AS unit_price,
               p.stock_quantity,
               ci.quantity * COALESCE(p.sale_price, p.price) AS line_total
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.customer_id = $1
        ORDER BY ci.created_at ASC, ci.id ASC
        "#,
    )
    .bind(customer.customer_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        summarize_cart(items),
        Some(Meta::empty()),
    ))
}

pub async fn add_item(
    pool: &DbPool,
    customer: &AuthCustomer,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product: Option<StockRow> =
        sqlx::query_as("SELECT name, stock_quantity, is_active FROM products WHERE id = $1")
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;
    let product = match product {
        Some(p) if p.is_active => p,
        _ => return Err(AppError::NotFound("Product")),
    };
    check_stock(payload.product_id, &product, payload.quantity)?;

    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (id, customer_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (customer_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(customer.customer_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await
    .map_err(map_cart_write_error)?;

    audit::record(
        pool,
        Some(customer.customer_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Item added to cart", cart_item, None))
}

/// Set a line's quantity; zero or less removes the line.
pub async fn set_quantity(
    pool: &DbPool,
    customer: &AuthCustomer,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Option<CartItem>>> {
    if payload.quantity <= 0 {
        remove_line(pool, customer, item_id).await?;
        return Ok(ApiResponse::success(
            "Item removed from cart",
            None,
            Some(Meta::empty()),
        ));
    }

    #[derive(FromRow)]
    struct LineStock {
        product_id: Uuid,
        #[sqlx(flatten)]
        stock: StockRow,
    }

    let line: Option<LineStock> = sqlx::query_as(
        r#"
        SELECT ci.product_id, p.name, p.stock_quantity, p.is_active
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.id = $1 AND ci.customer_id = $2
        "#,
    )
    .bind(item_id)
    .bind(customer.customer_id)
    .fetch_optional(pool)
    .await?;
    let line = match line {
        Some(l) => l,
        None => return Err(AppError::NotFound("Cart item")),
    };
    check_stock(line.product_id, &line.stock, payload.quantity)?;

    let updated = sqlx::query_as::<_, CartItem>(
        r#"
        UPDATE cart_items
        SET quantity = $3
        WHERE id = $1 AND customer_id = $2
        RETURNING *
        "#,
    )
    .bind(item_id)
    .bind(customer.customer_id)
    .bind(payload.quantity)
    .fetch_optional(pool)
    .await?;

    // The line may have been converted into an order in between.
    let updated = match updated {
        Some(item) => item,
        None => return Err(AppError::NotFound("Cart item")),
    };

    audit::record(
        pool,
        Some(customer.customer_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "cart_item_id": item_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Cart updated", Some(updated), None))
}

pub async fn remove_item(
    pool: &DbPool,
    customer: &AuthCustomer,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    remove_line(pool, customer, item_id).await?;
    Ok(ApiResponse::success(
        "Item removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn remove_line(pool: &DbPool, customer: &AuthCustomer, item_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND customer_id = $2")
        .bind(item_id)
        .bind(customer.customer_id)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        audit::record(
            pool,
            Some(customer.customer_id),
            "cart_remove",
            "cart_items",
            serde_json::json!({ "cart_item_id": item_id }),
        )
        .await;
    }
    Ok(())
}
