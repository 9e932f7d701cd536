use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddCartItemRequest, CartResponse, MergeCartRequest, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::{AuthUser, ShopperIdentity},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/{id}", put(update_item).delete(remove_item))
        .route("/merge", post(merge_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Resolve the caller's active cart, creating it if absent", body = ApiResponse<CartResponse>),
        (status = 400, description = "Neither a user token nor a session id supplied"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    identity: ShopperIdentity,
) -> AppResult<Json<ApiResponse<CartResponse>>> {
    let resp = cart_service::get_cart(&state.pool, &identity).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 201, description = "Add or bump a cart item, totals recomputed", body = ApiResponse<CartResponse>),
        (status = 400, description = "Inactive product, bad quantity or insufficient stock"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    identity: ShopperIdentity,
    Json(payload): Json<AddCartItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartResponse>>)> {
    let resp = cart_service::add_item(&state.pool, &identity, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item ID")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated, totals recomputed", body = ApiResponse<CartResponse>),
        (status = 400, description = "Bad quantity or insufficient stock"),
        (status = 404, description = "Item not found in the caller's cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    identity: ShopperIdentity,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartResponse>>> {
    let resp = cart_service::update_item(&state.pool, &identity, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item ID")
    ),
    responses(
        (status = 204, description = "Item removed, totals recomputed"),
        (status = 404, description = "Item not found in the caller's cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    identity: ShopperIdentity,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    cart_service::remove_item(&state.pool, &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 204, description = "All items removed, totals reset"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    identity: ShopperIdentity,
) -> AppResult<StatusCode> {
    cart_service::clear_cart(&state.pool, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/cart/merge",
    request_body = MergeCartRequest,
    responses(
        (status = 200, description = "Session cart folded into the user cart", body = ApiResponse<CartResponse>),
        (status = 401, description = "Authentication required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn merge_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MergeCartRequest>,
) -> AppResult<Json<ApiResponse<CartResponse>>> {
    let resp = cart_service::merge_session_cart(&state.pool, &user, &payload.session_id).await?;
    Ok(Json(resp))
}
