use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        cart::{AddToCartRequest, CartSummary, UpdateCartItemRequest},
        catalog::{CategoryList, ProductList, ProvinceList, ReviewList},
        orders::{CreateOrderRequest, OrderCreated, OrderList, OrderWithItems, ShippingAddress},
    },
    models::{
        CartItem, CartLine, CatalogProduct, Category, CustomerProfile, Order, OrderItem,
        OrderStatus, OrderSummary, Province, Review, ShippingDetails, StockStatus,
    },
    response::{ApiResponse, ErrorBody, Meta},
    routes::{auth, cart, catalog, health, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::login,
        auth::register,
        catalog::list_products,
        catalog::get_product,
        catalog::list_reviews,
        catalog::list_categories,
        catalog::list_provinces,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::pay_order,
        orders::cancel_order
    ),
    components(
        schemas(
            CustomerProfile,
            CatalogProduct,
            StockStatus,
            Category,
            Province,
            Review,
            CartItem,
            CartLine,
            CartSummary,
            AddToCartRequest,
            UpdateCartItemRequest,
            Order,
            OrderStatus,
            OrderItem,
            OrderSummary,
            ShippingDetails,
            ShippingAddress,
            CreateOrderRequest,
            OrderCreated,
            OrderList,
            OrderWithItems,
            ProductList,
            ReviewList,
            CategoryList,
            ProvinceList,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            params::Pagination,
            params::CatalogQuery,
            params::OrderListQuery,
            ErrorBody,
            Meta,
            ApiResponse<CatalogProduct>,
            ApiResponse<ProductList>,
            ApiResponse<CartSummary>,
            ApiResponse<OrderCreated>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<AuthResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Catalog", description = "Products, reviews, categories and provinces"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order creation and history"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
