use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::products::ProductSummary;
use crate::models::Wishlist;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWishlistRequest {
    pub name: String,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateWishlistRequest {
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddWishlistItemRequest {
    pub product_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistSummary {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub item_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistItemDto {
    pub id: Uuid,
    pub product: ProductSummary,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistWithItems {
    pub wishlist: Wishlist,
    pub items: Vec<WishlistItemDto>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct WishlistList {
    #[schema(value_type = Vec<WishlistSummary>)]
    pub items: Vec<WishlistSummary>,
}
