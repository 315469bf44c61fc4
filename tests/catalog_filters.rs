mod common;

use maple_store_api::{
    error::AppError,
    models::StockStatus,
    routes::params::CatalogQuery,
    services::catalog_service,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{create_product, ensure_category, setup_state};

#[tokio::test]
async fn category_and_price_range_filter_sorted_by_name() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let category_name = format!("Food {}", Uuid::new_v4().simple());
    let category = ensure_category(&state, &category_name).await?;
    for (name, price) in [
        ("Wild Rice", 3500),
        ("Butter Tarts", 2500),
        ("Ice Wine Jelly", 1500),
        ("Cheddar", 3000),
        ("Bannock Mix", 2000),
    ] {
        create_product(&state, category, name, Decimal::new(price, 2), 10).await?;
    }

    let listed = catalog_service::list_products(
        &state.pool,
        CatalogQuery {
            category: Some(category_name.clone()),
            min_price: Some(Decimal::from(20)),
            max_price: Some(Decimal::from(30)),
            ..Default::default()
        },
    )
    .await?;

    let names: Vec<String> = listed
        .data
        .expect("products")
        .items
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Bannock Mix", "Butter Tarts", "Cheddar"]);
    Ok(())
}

#[tokio::test]
async fn search_matches_literally_and_derives_stock_status() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let category_name = format!("Search {}", Uuid::new_v4().simple());
    let category = ensure_category(&state, &category_name).await?;
    create_product(&state, category, "Alpine 100% Pure", Decimal::ONE, 1).await?;
    create_product(&state, category, "Birch 1000 Sugar", Decimal::ONE, 0).await?;
    create_product(&state, category, "Spruce Tips", Decimal::ONE, 50).await?;

    let listed = catalog_service::list_products(
        &state.pool,
        CatalogQuery {
            category: Some(category_name.clone()),
            search: Some("100%".into()),
            ..Default::default()
        },
    )
    .await?;
    let items = listed.data.expect("products").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Alpine 100% Pure");
    assert_eq!(items[0].stock_status, StockStatus::LowStock);

    let all = catalog_service::list_products(
        &state.pool,
        CatalogQuery {
            category: Some(category_name),
            ..Default::default()
        },
    )
    .await?;
    let statuses: Vec<StockStatus> = all
        .data
        .expect("products")
        .items
        .into_iter()
        .map(|p| p.stock_status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            StockStatus::LowStock,
            StockStatus::OutOfStock,
            StockStatus::InStock
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unknown_product_is_not_found() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let err = catalog_service::get_product(&state.pool, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));

    let err = catalog_service::list_reviews(&state.pool, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Product")));
    Ok(())
}

#[tokio::test]
async fn all_provinces_are_seeded() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let provinces = catalog_service::list_provinces(&state.pool)
        .await?
        .data
        .expect("provinces")
        .items;
    assert_eq!(provinces.len(), 13);
    let quebec = provinces
        .iter()
        .find(|p| p.code == "QC")
        .expect("quebec");
    assert_eq!(quebec.tax_rate, Decimal::new(14975, 5));
    Ok(())
}
