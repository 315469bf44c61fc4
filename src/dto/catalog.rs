use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{CatalogProduct, Category, Province, Review};

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<CatalogProduct>)]
    pub items: Vec<CatalogProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<Review>)]
    pub items: Vec<Review>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProvinceList {
    #[schema(value_type = Vec<Province>)]
    pub items: Vec<Province>,
}
