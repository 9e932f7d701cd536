use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Product, ProductImage};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub sku: String,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub cost: Option<i64>,
    pub stock_quantity: i32,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    /// Derived from the name when not supplied.
    pub slug: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub category_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub sale_price: Option<i64>,
    pub cost: Option<i64>,
    pub stock_quantity: Option<i32>,
    pub min_order_quantity: Option<i32>,
    pub max_order_quantity: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddProductImageRequest {
    pub url: String,
    pub alt_text: Option<String>,
    pub display_order: Option<i32>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub categories: Vec<Category>,
}

/// Compact product view embedded in cart and wishlist payloads.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub stock_quantity: i32,
    pub primary_image: Option<String>,
}
