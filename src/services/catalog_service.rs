use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::catalog::{CategoryList, ProductList, ProvinceList, ReviewList},
    error::{AppError, AppResult},
    models::{CatalogProduct, Category, Province, Review, StockStatus},
    response::{ApiResponse, Meta},
    routes::params::CatalogQuery,
};

const CATALOG_SELECT: &str = r#"
    SELECT p.id, p.sku, p.name, p.description, p.price, p.sale_price,
           p.stock_quantity, p.low_stock_threshold, p.image_emoji,
           c.name AS category_name,
           pr.name AS origin_province,
           ROUND(COALESCE(AVG(r.rating), 0), 2) AS avg_rating,
           COUNT(r.id) AS review_count
    FROM products p
    JOIN categories c ON c.id = p.category_id
    LEFT JOIN provinces pr ON pr.id = p.origin_province_id
    LEFT JOIN reviews r ON r.product_id = p.id
    WHERE p.is_active = TRUE
"#;

const CATALOG_GROUP: &str = " GROUP BY p.id, c.name, pr.name";

#[derive(FromRow)]
struct CatalogRow {
    id: Uuid,
    sku: String,
    name: String,
    description: Option<String>,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock_quantity: i32,
    low_stock_threshold: i32,
    image_emoji: Option<String>,
    category_name: String,
    origin_province: Option<String>,
    avg_rating: Decimal,
    review_count: i64,
}

impl From<CatalogRow> for CatalogProduct {
    fn from(row: CatalogRow) -> Self {
        CatalogProduct {
            stock_status: StockStatus::from_levels(row.stock_quantity, row.low_stock_threshold),
            id: row.id,
            sku: row.sku,
            name: row.name,
            description: row.description,
            price: row.price,
            sale_price: row.sale_price,
            stock_quantity: row.stock_quantity,
            low_stock_threshold: row.low_stock_threshold,
            image_emoji: row.image_emoji,
            category_name: row.category_name,
            origin_province: row.origin_province,
            avg_rating: row.avg_rating,
            review_count: row.review_count,
        }
    }
}

/// Escape `LIKE` metacharacters so user input only ever matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Build the filtered catalog query. Filters are ANDed together.
pub fn build_catalog_query(query: &CatalogQuery) -> AppResult<QueryBuilder<'static, Postgres>> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(AppError::Validation(
                "minPrice must not be greater than maxPrice".into(),
            ));
        }
    }
    if query.min_price.is_some_and(|p| p.is_sign_negative()) {
        return Err(AppError::Validation("minPrice must not be negative".into()));
    }

    let mut builder = QueryBuilder::<Postgres>::new(CATALOG_SELECT);

    if let Some(category) = non_empty(&query.category) {
        builder.push(" AND c.name = ").push_bind(category.to_string());
    }

    if let Some(search) = non_empty(&query.search) {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(min_price) = query.min_price {
        builder.push(" AND p.price >= ").push_bind(min_price);
    }

    if let Some(max_price) = query.max_price {
        builder.push(" AND p.price <= ").push_bind(max_price);
    }

    if let Some(region) = non_empty(&query.region) {
        builder.push(" AND pr.name = ").push_bind(region.to_string());
    }

    builder.push(CATALOG_GROUP);
    builder.push(" ORDER BY p.name ASC, p.id ASC");
    Ok(builder)
}

pub async fn list_products(
    pool: &DbPool,
    query: CatalogQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut builder = build_catalog_query(&query)?;
    let items: Vec<CatalogProduct> = builder
        .build_query_as::<CatalogRow>()
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(CatalogProduct::from)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_product(pool: &DbPool, id: Uuid) -> AppResult<ApiResponse<CatalogProduct>> {
    let mut builder = QueryBuilder::<Postgres>::new(CATALOG_SELECT);
    builder.push(" AND p.id = ").push_bind(id);
    builder.push(CATALOG_GROUP);

    let product = builder
        .build_query_as::<CatalogRow>()
        .fetch_optional(pool)
        .await?
        .map(CatalogProduct::from);
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound("Product")),
    };
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn list_reviews(pool: &DbPool, product_id: Uuid) -> AppResult<ApiResponse<ReviewList>> {
    let exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(product_id)
            .fetch_optional(pool)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Product"));
    }

    let items = sqlx::query_as::<_, Review>(
        r#"
        SELECT r.id, r.rating, r.title, r.review_text, r.is_verified_purchase,
               r.helpful_count, r.created_at, c.first_name, c.last_name
        FROM reviews r
        JOIN customers c ON c.id = r.customer_id
        WHERE r.product_id = $1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success("Reviews", ReviewList { items }, None))
}

pub async fn list_categories(pool: &DbPool) -> AppResult<ApiResponse<CategoryList>> {
    let items = sqlx::query_as::<_, Category>(
        r#"
        SELECT c.id, c.name, c.description, c.display_order,
               COUNT(p.id) AS product_count
        FROM categories c
        LEFT JOIN products p ON p.category_id = c.id AND p.is_active = TRUE
        WHERE c.is_active = TRUE
        GROUP BY c.id
        ORDER BY c.display_order, c.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success("Categories", CategoryList { items }, None))
}

pub async fn list_provinces(pool: &DbPool) -> AppResult<ApiResponse<ProvinceList>> {
    let items = sqlx::query_as::<_, Province>(
        "SELECT id, code, name, tax_rate FROM provinces ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(ApiResponse::success("Provinces", ProvinceList { items }, None))
}
