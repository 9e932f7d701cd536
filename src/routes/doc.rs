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
        cart::{AddCartItemRequest, CartItemDto, CartResponse, MergeCartRequest, UpdateCartItemRequest},
        products::{
            AddProductImageRequest, CategoryList, CreateProductRequest, ProductDetail,
            ProductList, ProductSummary, UpdateProductRequest,
        },
        wishlist::{
            AddWishlistItemRequest, CreateWishlistRequest, UpdateWishlistRequest, WishlistItemDto,
            WishlistList, WishlistSummary, WishlistWithItems,
        },
    },
    models::{Cart, CartItem, Category, Product, ProductImage, Wishlist, WishlistItem},
    response::{ApiResponse, Meta},
    routes::{admin, cart, health, params, products as product_routes, wishlist},
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
        product_routes::list_products,
        product_routes::list_categories,
        product_routes::get_product,
        product_routes::related_products,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::add_product_image,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        cart::merge_cart,
        wishlist::list_wishlists,
        wishlist::get_wishlist,
        wishlist::create_wishlist,
        wishlist::update_wishlist,
        wishlist::delete_wishlist,
        wishlist::add_item,
        wishlist::remove_item,
        admin::list_low_stock
    ),
    components(
        schemas(
            Product,
            Category,
            ProductImage,
            Cart,
            CartItem,
            Wishlist,
            WishlistItem,
            ProductSummary,
            ProductList,
            CategoryList,
            ProductDetail,
            CreateProductRequest,
            UpdateProductRequest,
            AddProductImageRequest,
            AddCartItemRequest,
            UpdateCartItemRequest,
            MergeCartRequest,
            CartItemDto,
            CartResponse,
            CreateWishlistRequest,
            UpdateWishlistRequest,
            AddWishlistItemRequest,
            WishlistSummary,
            WishlistItemDto,
            WishlistWithItems,
            WishlistList,
            params::ProductQuery,
            params::LowStockQuery,
            Meta,
            health::HealthData,
            ApiResponse<health::HealthData>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<CartResponse>,
            ApiResponse<WishlistWithItems>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Admin", description = "Staff-only endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
