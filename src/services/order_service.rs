use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, DbBackend,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, Statement,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    db::{DbPool, OrmConn},
    dto::orders::{CreateOrderRequest, OrderCreated, OrderList, OrderWithItems, ShippingAddress},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        customers::Entity as Customers,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthCustomer,
    models::{Order, OrderItem, OrderStatus, OrderSummary, ShippingDetails},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
};

/// Locks the customer's cart lines and the products they reference. Rows are
/// locked in product id order so concurrent checkouts cannot deadlock on
/// overlapping products.
const LOCK_CART_SQL: &str = r#"
    SELECT ci.id AS cart_item_id,
           ci.product_id,
           p.name AS product_name,
           p.image_emoji,
           ci.quantity,
           COALESCE(p.sale_price, p.price) AS unit_price,
           p.stock_quantity,
           p.is_active
    FROM cart_items ci
    JOIN products p ON p.id = ci.product_id
    WHERE ci.customer_id = $1
    ORDER BY ci.product_id
    FOR UPDATE OF ci, p
"#;

/// A cart line read under lock, with the product state at that instant.
#[derive(Debug, Clone, FromQueryResult)]
pub struct LockedCartLine {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_emoji: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub stock_quantity: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub image_emoji: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub lines: Vec<PlannedLine>,
    pub total_amount: Decimal,
}

/// Validate every locked line against stock and price the order.
///
/// Nothing is written here; a failure on any line rejects the whole cart.
pub fn plan_order(lines: &[LockedCartLine]) -> AppResult<OrderPlan> {
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut planned = Vec::with_capacity(lines.len());
    let mut total_amount = Decimal::ZERO;
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::Validation("Cart has invalid quantity".into()));
        }
        let available = if line.is_active { line.stock_quantity } else { 0 };
        if line.quantity > available {
            return Err(AppError::InsufficientStock {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                requested: line.quantity,
                available,
            });
        }

        let line_total = line.unit_price * Decimal::from(line.quantity);
        total_amount += line_total;
        planned.push(PlannedLine {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            image_emoji: line.image_emoji.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total,
        });
    }

    Ok(OrderPlan {
        lines: planned,
        total_amount,
    })
}

pub fn validate_shipping(address: ShippingAddress) -> AppResult<ShippingAddress> {
    let fields = [
        ("firstName", &address.first_name),
        ("lastName", &address.last_name),
        ("street", &address.street),
        ("city", &address.city),
        ("postalCode", &address.postal_code),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "shippingAddress.{name} is required"
        )));
    }

    Ok(ShippingAddress {
        first_name: address.first_name.trim().to_string(),
        last_name: address.last_name.trim().to_string(),
        street: address.street.trim().to_string(),
        city: address.city.trim().to_string(),
        postal_code: address.postal_code.trim().to_uppercase(),
        province_id: address.province_id,
    })
}

pub async fn create_order(
    state: &AppState,
    customer: &AuthCustomer,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderCreated>> {
    let shipping = validate_shipping(payload.shipping_address)?;
    let customer_id = customer.customer_id;

    let placed = match tokio::time::timeout(
        state.config.order_timeout,
        place_order(&state.orm, customer_id, &shipping),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!(customer_id = %customer_id, "order transaction deadline exceeded");
            return Err(AppError::TransactionAborted("deadline exceeded".into()));
        }
    };

    tracing::info!(
        order_id = %placed.order_id,
        customer_id = %customer_id,
        total = %placed.order.total_amount,
        items = placed.items.len(),
        "order created"
    );
    audit::record(
        &state.pool,
        Some(customer_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": placed.order_id, "order_number": placed.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created successfully",
        placed,
        Some(Meta::empty()),
    ))
}

/// Run the checkout as one transaction: commit on success, explicit rollback otherwise.
pub async fn place_order(
    orm: &OrmConn,
    customer_id: Uuid,
    shipping: &ShippingAddress,
) -> AppResult<OrderCreated> {
    let txn = orm
        .begin()
        .await
        .map_err(|err| AppError::from(err).into_aborted())?;

    match write_order(&txn, customer_id, shipping).await {
        Ok(created) => {
            txn.commit()
                .await
                .map_err(|err| AppError::from(err).into_aborted())?;
            Ok(created)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "order rollback failed");
            }
            Err(err.into_aborted())
        }
    }
}

async fn write_order(
    txn: &DatabaseTransaction,
    customer_id: Uuid,
    shipping: &ShippingAddress,
) -> AppResult<OrderCreated> {
    // Serializes checkouts of the same customer.
    let customer = Customers::find_by_id(customer_id)
        .lock(LockType::NoKeyUpdate)
        .one(txn)
        .await?;
    match customer {
        Some(c) if c.is_active => {}
        _ => return Err(AppError::CustomerNotFound),
    }

    let province = txn
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT id FROM provinces WHERE id = $1",
            [shipping.province_id.into()],
        ))
        .await?;
    if province.is_none() {
        return Err(AppError::Validation("Unknown shipping province".into()));
    }

    let lines = LockedCartLine::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        LOCK_CART_SQL,
        [customer_id.into()],
    ))
    .all(txn)
    .await?;

    let plan = plan_order(&lines)?;

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(build_order_number(order_id)),
        customer_id: Set(customer_id),
        status: Set(OrderStatus::Created.as_str().to_string()),
        total_amount: Set(plan.total_amount),
        shipping_first_name: Set(shipping.first_name.clone()),
        shipping_last_name: Set(shipping.last_name.clone()),
        shipping_street: Set(shipping.street.clone()),
        shipping_city: Set(shipping.city.clone()),
        shipping_postal_code: Set(shipping.postal_code.clone()),
        shipping_province_id: Set(shipping.province_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(txn)
    .await?;

    let mut items = Vec::with_capacity(plan.lines.len());
    for line in &plan.lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        let decremented = Products::update_many()
            .col_expr(
                ProdCol::StockQuantity,
                Expr::col(ProdCol::StockQuantity).sub(line.quantity),
            )
            .filter(ProdCol::Id.eq(line.product_id))
            .filter(ProdCol::StockQuantity.gte(line.quantity))
            .exec(txn)
            .await?;
        if decremented.rows_affected != 1 {
            let current = Products::find_by_id(line.product_id).one(txn).await?;
            return Err(shortfall(line, current.as_ref()));
        }

        items.push(OrderItem {
            id: item.id,
            order_id: order.id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            image_emoji: line.image_emoji.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
        });
    }

    // Only the lines read under lock; a line inserted since then was never priced.
    let ordered_lines: Vec<Uuid> = lines.iter().map(|line| line.cart_item_id).collect();
    CartItems::delete_many()
        .filter(CartCol::CustomerId.eq(customer_id))
        .filter(CartCol::Id.is_in(ordered_lines))
        .exec(txn)
        .await?;

    let order = order_from_entity(order)?;
    Ok(OrderCreated {
        order_id: order.id,
        order_number: order.order_number.clone(),
        order,
        items,
    })
}

/// Error for a line whose guarded decrement matched no row, reporting the stock seen now.
pub fn shortfall(line: &PlannedLine, current: Option<&ProductModel>) -> AppError {
    let available = match current {
        Some(product) if product.is_active => product.stock_quantity.max(0),
        _ => 0,
    };
    AppError::InsufficientStock {
        product_id: line.product_id,
        product_name: line.product_name.clone(),
        requested: line.quantity,
        available,
    }
}

pub async fn list_orders(
    pool: &DbPool,
    customer: &AuthCustomer,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            s.parse::<OrderStatus>()
                .map_err(|err| AppError::Validation(err.to_string()))?,
        ),
        None => None,
    };
    let status = status.map(|s| s.as_str());

    let items = sqlx::query_as::<_, OrderSummary>(
        r#"
        SELECT o.id, o.order_number, o.status, o.total_amount,
               COUNT(oi.id) AS item_count, o.created_at
        FROM orders o
        LEFT JOIN order_items oi ON oi.order_id = o.id
        WHERE o.customer_id = $1 AND ($2::text IS NULL OR o.status = $2)
        GROUP BY o.id
        ORDER BY o.created_at DESC, o.id
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(customer.customer_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE customer_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(customer.customer_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total.0)),
    ))
}

pub async fn get_order(
    state: &AppState,
    customer: &AuthCustomer,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(customer.customer_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => order_from_entity(o)?,
        None => return Err(AppError::NotFound("Order")),
    };

    let items = load_order_items(&state.pool, order.id).await?;
    let shipping_province: Option<(String,)> =
        sqlx::query_as("SELECT name FROM provinces WHERE id = $1")
            .bind(order.shipping.province_id)
            .fetch_optional(&state.pool)
            .await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order,
            shipping_province: shipping_province.map(|(name,)| name),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn pay_order(
    state: &AppState,
    customer: &AuthCustomer,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = transition_order(&state.orm, customer.customer_id, id, OrderStatus::Paid).await?;
    audit::record(
        &state.pool,
        Some(customer.customer_id),
        "order_pay",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;
    Ok(ApiResponse::success("Payment recorded", order, Some(Meta::empty())))
}

pub async fn cancel_order(
    state: &AppState,
    customer: &AuthCustomer,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order =
        transition_order(&state.orm, customer.customer_id, id, OrderStatus::Cancelled).await?;
    audit::record(
        &state.pool,
        Some(customer.customer_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;
    Ok(ApiResponse::success("Order cancelled", order, Some(Meta::empty())))
}

/// Move an order along its lifecycle, restocking when it is cancelled.
pub async fn transition_order(
    orm: &OrmConn,
    customer_id: Uuid,
    id: Uuid,
    next: OrderStatus,
) -> AppResult<Order> {
    let txn = orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(customer_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound("Order")),
    };

    let current = parse_status(&order.status)?;
    if !current.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "Order cannot move from {current} to {next}"
        )));
    }

    if current.releases_stock(next) {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .order_by_asc(OrderItemCol::ProductId)
            .all(&txn)
            .await?;
        for item in items {
            Products::update_many()
                .col_expr(
                    ProdCol::StockQuantity,
                    Expr::col(ProdCol::StockQuantity).add(item.quantity),
                )
                .filter(ProdCol::Id.eq(item.product_id))
                .exec(&txn)
                .await?;
        }
    }

    let mut active: OrderActive = order.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "order status changed");
    order_from_entity(order)
}

async fn load_order_items(pool: &DbPool, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id,
               p.name AS product_name, p.image_emoji,
               oi.quantity, oi.unit_price,
               oi.quantity * oi.unit_price AS line_total
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = $1
        ORDER BY oi.product_id
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

fn parse_status(status: &str) -> AppResult<OrderStatus> {
    status
        .parse()
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        order_number: model.order_number,
        customer_id: model.customer_id,
        status: parse_status(&model.status)?,
        total_amount: model.total_amount,
        shipping: ShippingDetails {
            first_name: model.shipping_first_name,
            last_name: model.shipping_last_name,
            street: model.shipping_street,
            city: model.shipping_city,
            postal_code: model.shipping_postal_code,
            province_id: model.shipping_province_id,
        },
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string().to_uppercase();
    format!("ORD-{}-{}", date, &suffix[..8])
}
