use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::products::{
        AddProductImageRequest, CategoryList, CreateProductRequest, ProductDetail, ProductList,
        UpdateProductRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Product, ProductImage},
    response::ApiResponse,
    routes::params::{ProductQuery, RelatedQuery},
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(list_categories))
        .route(
            "/{identifier}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{identifier}/related", get(related_products))
        .route("/{identifier}/images", post(add_product_image))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Free-text search over name, description and model"),
        ("brand" = Option<String>, Query, description = "Exact brand match"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("min_price" = Option<i64>, Query, description = "Inclusive lower price bound"),
        ("max_price" = Option<i64>, Query, description = "Inclusive upper price bound"),
        ("featured" = Option<bool>, Query, description = "Featured products only"),
        ("sort_by" = Option<String>, Query, description = "created_at, price or name"),
        ("sort_order" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = catalog_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/categories",
    responses(
        (status = 200, description = "List active categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Products"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{identifier}",
    params(
        ("identifier" = String, Path, description = "Product UUID or slug")
    ),
    responses(
        (status = 200, description = "Get product with images and categories", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = catalog_service::get_product_by_identifier(&state, &identifier).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{identifier}/related",
    params(
        ("identifier" = String, Path, description = "Product UUID or slug"),
        ("limit" = Option<u64>, Query, description = "Cap on related products, default 8")
    ),
    responses(
        (status = 200, description = "Active products sharing a category", body = ApiResponse<ProductList>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn related_products(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<RelatedQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let id = catalog_service::resolve_product_id(&state, &identifier).await?;
    let resp = catalog_service::related_products(&state, id, query.limit).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = catalog_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/products/{identifier}",
    params(
        ("identifier" = String, Path, description = "Product UUID or slug")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(identifier): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let id = catalog_service::resolve_product_id(&state, &identifier).await?;
    let resp = catalog_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{identifier}",
    params(
        ("identifier" = String, Path, description = "Product UUID or slug")
    ),
    responses(
        (status = 204, description = "Deleted product"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(identifier): Path<String>,
) -> AppResult<StatusCode> {
    let id = catalog_service::resolve_product_id(&state, &identifier).await?;
    catalog_service::delete_product(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/products/{identifier}/images",
    params(
        ("identifier" = String, Path, description = "Product UUID or slug")
    ),
    request_body = AddProductImageRequest,
    responses(
        (status = 201, description = "Image attached", body = ApiResponse<ProductImage>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn add_product_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(identifier): Path<String>,
    Json(payload): Json<AddProductImageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProductImage>>)> {
    let id = catalog_service::resolve_product_id(&state, &identifier).await?;
    let resp = catalog_service::add_product_image(&state, &user, id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
