use maple_store_api::{
    error::AppError,
    models::{OrderStatus, StockStatus},
    routes::params::CatalogQuery,
    services::catalog_service::{build_catalog_query, escape_like},
};
use rust_decimal::Decimal;

#[test]
fn stock_status_follows_threshold() {
    assert_eq!(StockStatus::from_levels(0, 10), StockStatus::OutOfStock);
    assert_eq!(StockStatus::from_levels(1, 10), StockStatus::LowStock);
    assert_eq!(StockStatus::from_levels(10, 10), StockStatus::LowStock);
    assert_eq!(StockStatus::from_levels(11, 10), StockStatus::InStock);
    assert_eq!(StockStatus::from_levels(5, 0), StockStatus::InStock);
}

#[test]
fn stock_status_serializes_as_variant_name() {
    let json = serde_json::to_value(StockStatus::LowStock).unwrap();
    assert_eq!(json, "LowStock");
}

#[test]
fn order_lifecycle_transitions() {
    use OrderStatus::*;

    assert!(Created.can_transition_to(Paid));
    assert!(Created.can_transition_to(Cancelled));
    assert!(Paid.can_transition_to(Shipped));
    assert!(Paid.can_transition_to(Cancelled));
    assert!(Shipped.can_transition_to(Delivered));

    assert!(!Created.can_transition_to(Shipped));
    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Delivered.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Paid));
    assert!(!Paid.can_transition_to(Paid));

    assert!(Created.releases_stock(Cancelled));
    assert!(Paid.releases_stock(Cancelled));
    assert!(!Shipped.releases_stock(Cancelled));
    assert!(!Created.releases_stock(Paid));
}

#[test]
fn order_status_parses_its_own_text() {
    for status in [
        OrderStatus::Created,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
    }
    assert!("refunded".parse::<OrderStatus>().is_err());
}

#[test]
fn like_metacharacters_are_escaped() {
    assert_eq!(escape_like("maple"), "maple");
    assert_eq!(escape_like("100%"), "100\\%");
    assert_eq!(escape_like("a_b"), "a\\_b");
    assert_eq!(escape_like("back\\slash"), "back\\\\slash");
}

#[test]
fn catalog_query_composes_filters_in_order() {
    let query = CatalogQuery {
        category: Some("Food".into()),
        search: Some("maple".into()),
        min_price: Some(Decimal::from(20)),
        max_price: Some(Decimal::from(30)),
        region: Some("Quebec".into()),
    };

    let builder = build_catalog_query(&query).expect("query");
    let sql = builder.sql();

    assert!(sql.contains("p.is_active = TRUE"));
    assert!(sql.contains("AND c.name = $1"));
    assert!(sql.contains("AND (p.name ILIKE $2 OR p.description ILIKE $3)"));
    assert!(sql.contains("AND p.price >= $4"));
    assert!(sql.contains("AND p.price <= $5"));
    assert!(sql.contains("AND pr.name = $6"));
    assert!(sql.trim_end().ends_with("ORDER BY p.name ASC, p.id ASC"));
}

#[test]
fn blank_filters_are_ignored() {
    let query = CatalogQuery {
        category: Some("  ".into()),
        search: Some(String::new()),
        ..Default::default()
    };

    let builder = build_catalog_query(&query).expect("query");
    assert!(!builder.sql().contains('$'));
}

#[test]
fn inverted_price_range_is_rejected() {
    let query = CatalogQuery {
        min_price: Some(Decimal::from(30)),
        max_price: Some(Decimal::from(20)),
        ..Default::default()
    };

    assert!(matches!(
        build_catalog_query(&query),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn pagination_defaults_and_bounds() {
    use maple_store_api::routes::params::Pagination;

    assert_eq!(Pagination::default().normalize(), (1, 20, 0));
    let clamped = Pagination {
        page: Some(0),
        per_page: Some(1_000),
    };
    assert_eq!(clamped.normalize(), (1, 100, 0));
    let third = Pagination {
        page: Some(3),
        per_page: Some(10),
    };
    assert_eq!(third.normalize(), (3, 10, 20));
}

#[test]
fn huge_page_number_saturates_offset() {
    use maple_store_api::routes::params::Pagination;

    let far = Pagination {
        page: Some(i64::MAX),
        per_page: Some(100),
    };
    let (page, per_page, offset) = far.normalize();
    assert_eq!(page, i64::MAX);
    assert_eq!(per_page, 100);
    assert_eq!(offset, i64::MAX);
}
