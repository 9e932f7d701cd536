use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::products::ProductSummary,
    dto::wishlist::{
        AddWishlistItemRequest, CreateWishlistRequest, UpdateWishlistRequest, WishlistItemDto,
        WishlistList, WishlistSummary, WishlistWithItems,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{DEFAULT_WISHLIST_NAME, Wishlist, WishlistItem},
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct WishlistCountRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    is_public: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    item_count: i64,
}

#[derive(FromRow)]
struct WishlistItemRow {
    id: Uuid,
    product_id: Uuid,
    notes: Option<String>,
    added_at: DateTime<Utc>,
    name: String,
    slug: String,
    price: i64,
    sale_price: Option<i64>,
    stock_quantity: i32,
    primary_image: Option<String>,
}

async fn find_wishlist(pool: &DbPool, id: Uuid) -> AppResult<Wishlist> {
    sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Ownership is checked before any mutation is delegated.
async fn find_owned_wishlist(pool: &DbPool, id: Uuid, user: &AuthUser) -> AppResult<Wishlist> {
    let wishlist = find_wishlist(pool, id).await?;
    if wishlist.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(wishlist)
}

/// Idempotent: every user gets exactly one default wishlist, created lazily.
pub async fn get_or_create_default(pool: &DbPool, user: &AuthUser) -> AppResult<Wishlist> {
    let existing = sqlx::query_as::<_, Wishlist>(
        "SELECT * FROM wishlists WHERE user_id = $1 AND name = $2",
    )
    .bind(user.user_id)
    .bind(DEFAULT_WISHLIST_NAME)
    .fetch_optional(pool)
    .await?;

    if let Some(wishlist) = existing {
        return Ok(wishlist);
    }

    let wishlist = sqlx::query_as::<_, Wishlist>(
        r#"
        INSERT INTO wishlists (id, user_id, name, is_public)
        VALUES ($1, $2, $3, false)
        ON CONFLICT (user_id, name) DO UPDATE SET updated_at = wishlists.updated_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(DEFAULT_WISHLIST_NAME)
    .fetch_one(pool)
    .await?;

    Ok(wishlist)
}

pub async fn list_wishlists(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistList>> {
    // First access creates the default list.
    get_or_create_default(pool, user).await?;

    let rows = sqlx::query_as::<_, WishlistCountRow>(
        r#"
        SELECT w.*, COUNT(wi.id) AS item_count
        FROM wishlists w
        LEFT JOIN wishlist_items wi ON wi.wishlist_id = w.id
        WHERE w.user_id = $1
        GROUP BY w.id
        ORDER BY w.created_at
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| WishlistSummary {
            wishlist: Wishlist {
                id: row.id,
                user_id: row.user_id,
                name: row.name,
                is_public: row.is_public,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            item_count: row.item_count,
        })
        .collect();

    Ok(ApiResponse::success("OK", WishlistList { items }, None))
}

async fn load_items(pool: &DbPool, wishlist_id: Uuid) -> AppResult<Vec<WishlistItemDto>> {
    let rows = sqlx::query_as::<_, WishlistItemRow>(
        r#"
        SELECT wi.id, wi.product_id, wi.notes, wi.added_at,
               p.name, p.slug, p.price, p.sale_price, p.stock_quantity,
               (SELECT url FROM product_images pi
                WHERE pi.product_id = p.id AND pi.is_primary
                ORDER BY pi.display_order LIMIT 1) AS primary_image
        FROM wishlist_items wi
        JOIN products p ON p.id = wi.product_id
        WHERE wi.wishlist_id = $1
        ORDER BY wi.added_at DESC
        "#,
    )
    .bind(wishlist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| WishlistItemDto {
            id: row.id,
            product: ProductSummary {
                id: row.product_id,
                name: row.name,
                slug: row.slug,
                price: row.price,
                sale_price: row.sale_price,
                stock_quantity: row.stock_quantity,
                primary_image: row.primary_image,
            },
            notes: row.notes,
            added_at: row.added_at,
        })
        .collect())
}

/// Owners always see their lists; everyone else only public ones.
pub async fn get_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<WishlistWithItems>> {
    let wishlist = find_wishlist(pool, id).await?;
    if wishlist.user_id != user.user_id && !wishlist.is_public {
        return Err(AppError::Forbidden);
    }

    let items = load_items(pool, wishlist.id).await?;
    let data = WishlistWithItems { wishlist, items };
    Ok(ApiResponse::success("OK", data, None))
}

pub async fn create_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateWishlistRequest,
) -> AppResult<ApiResponse<Wishlist>> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }

    let duplicate: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM wishlists WHERE user_id = $1 AND name = $2")
            .bind(user.user_id)
            .bind(&name)
            .fetch_optional(pool)
            .await?;
    if duplicate.is_some() {
        return Err(AppError::Validation(format!(
            "a wishlist named \"{name}\" already exists"
        )));
    }

    let wishlist = sqlx::query_as::<_, Wishlist>(
        r#"
        INSERT INTO wishlists (id, user_id, name, is_public)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(&name)
    .bind(payload.is_public.unwrap_or(false))
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(
        "Wishlist created",
        wishlist,
        Some(Meta::empty()),
    ))
}

pub async fn update_wishlist(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateWishlistRequest,
) -> AppResult<ApiResponse<Wishlist>> {
    let wishlist = find_owned_wishlist(pool, id, user).await?;

    let name = match payload.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation("name is required".into()));
            }
            // Renaming the default list would spawn a second one on next access.
            if wishlist.is_default() && name != DEFAULT_WISHLIST_NAME {
                return Err(AppError::Validation(
                    "the default wishlist cannot be renamed".into(),
                ));
            }
            name
        }
        None => wishlist.name.clone(),
    };
    let is_public = payload.is_public.unwrap_or(wishlist.is_public);

    let updated = sqlx::query_as::<_, Wishlist>(
        r#"
        UPDATE wishlists
        SET name = $2, is_public = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(wishlist.id)
    .bind(&name)
    .bind(is_public)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success(
        "Wishlist updated",
        updated,
        Some(Meta::empty()),
    ))
}

pub async fn delete_wishlist(pool: &DbPool, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let wishlist = find_owned_wishlist(pool, id, user).await?;
    if wishlist.is_default() {
        return Err(AppError::Validation(
            "the default wishlist cannot be deleted".into(),
        ));
    }

    sqlx::query("DELETE FROM wishlists WHERE id = $1")
        .bind(wishlist.id)
        .execute(pool)
        .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "wishlist_delete",
        Some("wishlists"),
        Some(serde_json::json!({ "wishlist_id": wishlist.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

/// Duplicate adds are idempotent: the notes are refreshed instead of erroring.
pub async fn add_item(
    pool: &DbPool,
    user: &AuthUser,
    wishlist_id: Uuid,
    payload: AddWishlistItemRequest,
) -> AppResult<ApiResponse<WishlistItem>> {
    let wishlist = find_owned_wishlist(pool, wishlist_id, user).await?;

    let product_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exists.is_none() {
        return Err(AppError::NotFound);
    }

    let existing: Option<WishlistItem> = sqlx::query_as(
        "SELECT * FROM wishlist_items WHERE wishlist_id = $1 AND product_id = $2",
    )
    .bind(wishlist.id)
    .bind(payload.product_id)
    .fetch_optional(pool)
    .await?;

    let item = if let Some(item) = existing {
        sqlx::query_as::<_, WishlistItem>(
            "UPDATE wishlist_items SET notes = $2 WHERE id = $1 RETURNING *",
        )
        .bind(item.id)
        .bind(payload.notes)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as::<_, WishlistItem>(
            r#"
            INSERT INTO wishlist_items (id, wishlist_id, product_id, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(wishlist.id)
        .bind(payload.product_id)
        .bind(payload.notes)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "wishlist_add_item",
        Some("wishlist_items"),
        Some(serde_json::json!({ "wishlist_id": wishlist.id, "product_id": payload.product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Added to wishlist",
        item,
        Some(Meta::empty()),
    ))
}

pub async fn remove_item(
    pool: &DbPool,
    user: &AuthUser,
    wishlist_id: Uuid,
    product_id: Uuid,
) -> AppResult<()> {
    let wishlist = find_owned_wishlist(pool, wishlist_id, user).await?;

    let result = sqlx::query(
        "DELETE FROM wishlist_items WHERE wishlist_id = $1 AND product_id = $2",
    )
    .bind(wishlist.id)
    .bind(product_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "wishlist_remove_item",
        Some("wishlist_items"),
        Some(serde_json::json!({ "wishlist_id": wishlist.id, "product_id": product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}
