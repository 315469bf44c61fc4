use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use maple_store_api::{
    config,
    db::{DbPool, create_pool, run_migrations},
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct SeedProduct {
    sku: &'static str,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    stock: i32,
    emoji: &'static str,
    category: &'static str,
    province_code: &'static str,
}

const CATEGORIES: [(&str, &str, i32); 4] = [
    ("Food", "Maple syrup, treats and pantry staples", 1),
    ("Apparel", "Warm clothing for cold winters", 2),
    ("Home", "Crafts and decor from coast to coast", 3),
    ("Outdoors", "Gear for lakes, trails and rinks", 4),
];

const PRODUCTS: [SeedProduct; 8] = [
    SeedProduct { sku: "FOOD-001", name: "Pure Maple Syrup", description: "Grade A amber syrup, 500 ml", price_cents: 2499, stock: 120, emoji: "🍁", category: "Food", province_code: "QC" },
    SeedProduct { sku: "FOOD-002", name: "Maple Butter", description: "Creamy whipped maple spread", price_cents: 1299, stock: 60, emoji: "🧈", category: "Food", province_code: "ON" },
    SeedProduct { sku: "FOOD-003", name: "Smoked Wild Salmon", description: "Hot-smoked sockeye from the Pacific coast", price_cents: 2899, stock: 8, emoji: "🐟", category: "Food", province_code: "BC" },
    SeedProduct { sku: "FOOD-004", name: "Ice Wine Chocolates", description: "Dark chocolate filled with Niagara ice wine", price_cents: 3499, stock: 0, emoji: "🍫", category: "Food", province_code: "ON" },
    SeedProduct { sku: "APP-001", name: "Buffalo Plaid Jacket", description: "Wool-blend red and black plaid", price_cents: 8999, stock: 25, emoji: "🧥", category: "Apparel", province_code: "MB" },
    SeedProduct { sku: "APP-002", name: "Knit Toque", description: "Hand-knit winter hat with pom-pom", price_cents: 2499, stock: 80, emoji: "🧢", category: "Apparel", province_code: "NS" },
    SeedProduct { sku: "HOME-001", name: "Inuit Soapstone Carving", description: "Hand-carved soapstone loon", price_cents: 14999, stock: 3, emoji: "🪶", category: "Home", province_code: "NU" },
    SeedProduct { sku: "OUT-001", name: "Cedar Canoe Paddle", description: "Hand-shaped western red cedar paddle", price_cents: 11999, stock: 15, emoji: "🛶", category: "Outdoors", province_code: "ON" },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = config::database_url()?;

    let pool = create_pool(&database_url, 2).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    seed_categories(&pool).await?;
    seed_products(&pool).await?;
    let customer_id = ensure_customer(&pool, "demo@maplestore.ca", "maple-demo-123").await?;

    pool.close().await;
    println!("Seed completed. Demo customer ID: {customer_id}");
    Ok(())
}

async fn seed_categories(pool: &DbPool) -> anyhow::Result<()> {
    for (name, description, display_order) in CATEGORIES {
        sqlx::query(
            r#"
            INSERT INTO categories (name, description, display_order)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(display_order)
        .execute(pool)
        .await?;
    }
    println!("Seeded categories");
    Ok(())
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    for product in &PRODUCTS {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, name, description, price, stock_quantity,
                                  low_stock_threshold, image_emoji, category_id, origin_province_id)
            SELECT $1, $2, $3, $4, $5, $6, 10, $7, c.id, pr.id
            FROM categories c, provinces pr
            WHERE c.name = $8 AND pr.code = $9
            ON CONFLICT (sku) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.sku)
        .bind(product.name)
        .bind(product.description)
        .bind(Decimal::new(product.price_cents, 2))
        .bind(product.stock)
        .bind(product.emoji)
        .bind(product.category)
        .bind(product.province_code)
        .execute(pool)
        .await?;
    }
    println!("Seeded products");
    Ok(())
}

async fn ensure_customer(pool: &DbPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let (customer_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO customers (id, email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, 'Demo', 'Customer')
        ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Ensured customer {email}");
    Ok(customer_id)
}
