use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::wishlist::{
        AddWishlistItemRequest, CreateWishlistRequest, UpdateWishlistRequest, WishlistList,
        WishlistWithItems,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Wishlist, WishlistItem},
    response::ApiResponse,
    services::wishlist_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlists).post(create_wishlist))
        .route(
            "/{id}",
            get(get_wishlist).put(update_wishlist).delete(delete_wishlist),
        )
        .route("/{id}/items", post(add_item))
        .route("/{id}/items/{product_id}", axum::routing::delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/wishlist",
    responses(
        (status = 200, description = "Caller's wishlists with item counts; the default list is created lazily", body = ApiResponse<WishlistList>),
        (status = 401, description = "Authentication required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn list_wishlists(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WishlistList>>> {
    let resp = wishlist_service::list_wishlists(&state.pool, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/wishlist/{id}",
    params(
        ("id" = Uuid, Path, description = "Wishlist ID")
    ),
    responses(
        (status = 200, description = "Wishlist with items", body = ApiResponse<WishlistWithItems>),
        (status = 403, description = "Private wishlist of another user"),
        (status = 404, description = "Wishlist not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn get_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<WishlistWithItems>>> {
    let resp = wishlist_service::get_wishlist(&state.pool, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/wishlist",
    request_body = CreateWishlistRequest,
    responses(
        (status = 201, description = "Wishlist created", body = ApiResponse<Wishlist>),
        (status = 400, description = "Validation error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn create_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateWishlistRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Wishlist>>)> {
    let resp = wishlist_service::create_wishlist(&state.pool, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/wishlist/{id}",
    params(
        ("id" = Uuid, Path, description = "Wishlist ID")
    ),
    request_body = UpdateWishlistRequest,
    responses(
        (status = 200, description = "Wishlist updated", body = ApiResponse<Wishlist>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Wishlist not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn update_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWishlistRequest>,
) -> AppResult<Json<ApiResponse<Wishlist>>> {
    let resp = wishlist_service::update_wishlist(&state.pool, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/{id}",
    params(
        ("id" = Uuid, Path, description = "Wishlist ID")
    ),
    responses(
        (status = 204, description = "Wishlist deleted"),
        (status = 400, description = "The default wishlist cannot be deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Wishlist not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn delete_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    wishlist_service::delete_wishlist(&state.pool, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/wishlist/{id}/items",
    params(
        ("id" = Uuid, Path, description = "Wishlist ID")
    ),
    request_body = AddWishlistItemRequest,
    responses(
        (status = 201, description = "Item added; a duplicate add refreshes the notes", body = ApiResponse<WishlistItem>),
        (status = 404, description = "Wishlist or product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddWishlistItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<WishlistItem>>)> {
    let resp = wishlist_service::add_item(&state.pool, &user, id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/wishlist/{id}/items/{product_id}",
    params(
        ("id" = Uuid, Path, description = "Wishlist ID"),
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Item removed"),
        (status = 404, description = "Wishlist or item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlist"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    wishlist_service::remove_item(&state.pool, &user, id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
