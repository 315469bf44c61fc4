use maple_store_api::{models::CartLine, services::cart_service::summarize_cart};
use rust_decimal::Decimal;
use uuid::Uuid;

fn cart_line(quantity: i32, price_cents: i64) -> CartLine {
    let unit_price = Decimal::new(price_cents, 2);
    CartLine {
        cart_item_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        product_name: "Item".into(),
        image_emoji: None,
        quantity,
        unit_price,
        stock_quantity: 100,
        line_total: unit_price * Decimal::from(quantity),
    }
}

#[test]
fn empty_cart_has_zero_subtotal_and_count() {
    let summary = summarize_cart(Vec::new());
    assert!(summary.items.is_empty());
    assert_eq!(summary.subtotal, "0.00");
    assert_eq!(summary.item_count, 0);
}

#[test]
fn subtotal_is_sum_of_line_totals_with_two_decimals() {
    let summary = summarize_cart(vec![cart_line(3, 1999), cart_line(1, 500), cart_line(2, 1250)]);

    // 59.97 + 5.00 + 25.00
    assert_eq!(summary.subtotal, "89.97");
    assert_eq!(summary.item_count, 6);
    assert_eq!(summary.items.len(), 3);
}

#[test]
fn whole_dollar_subtotal_keeps_cents() {
    let summary = summarize_cart(vec![cart_line(2, 1000)]);
    assert_eq!(summary.subtotal, "20.00");
}
