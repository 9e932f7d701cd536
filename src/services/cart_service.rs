use chrono::{Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddCartItemRequest, CartItemDto, CartResponse, UpdateCartItemRequest},
    dto::products::ProductSummary,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ShopperIdentity},
    models::{CART_STATUS_ACTIVE, CART_STATUS_MERGED, Cart},
    response::ApiResponse,
};

/// Session carts expire if the visitor never returns.
const SESSION_CART_TTL_DAYS: i64 = 30;

#[derive(FromRow)]
struct CartItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: i64,
    line_total: i64,
    name: String,
    slug: String,
    price: i64,
    sale_price: Option<i64>,
    stock_quantity: i32,
    primary_image: Option<String>,
}

#[derive(FromRow)]
struct ProductPricingRow {
    id: Uuid,
    is_active: bool,
    price: i64,
    sale_price: Option<i64>,
    stock_quantity: i32,
    min_order_quantity: i32,
    max_order_quantity: Option<i32>,
}

#[derive(FromRow)]
struct ScopedItemRow {
    cart_id: Uuid,
    stock_quantity: i32,
    min_order_quantity: i32,
    max_order_quantity: Option<i32>,
}

async fn find_active_cart(pool: &DbPool, identity: &ShopperIdentity) -> AppResult<Option<Cart>> {
    let cart = match identity {
        ShopperIdentity::User(user_id) => {
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1 AND status = $2")
                .bind(user_id)
                .bind(CART_STATUS_ACTIVE)
                .fetch_optional(pool)
                .await?
        }
        ShopperIdentity::Session(session_id) => {
            sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE session_id = $1 AND status = $2")
                .bind(session_id)
                .bind(CART_STATUS_ACTIVE)
                .fetch_optional(pool)
                .await?
        }
    };
    Ok(cart)
}

/// Resolve the single active cart for the caller, creating it lazily.
async fn resolve_cart(pool: &DbPool, identity: &ShopperIdentity) -> AppResult<Cart> {
    if let Some(cart) = find_active_cart(pool, identity).await? {
        return Ok(cart);
    }

    let id = Uuid::new_v4();
    let cart = match identity {
        ShopperIdentity::User(user_id) => {
            sqlx::query_as::<_, Cart>(
                r#"
                INSERT INTO carts (id, user_id, status)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(user_id)
            .bind(CART_STATUS_ACTIVE)
            .fetch_one(pool)
            .await?
        }
        ShopperIdentity::Session(session_id) => {
            let expires_at = Utc::now() + Duration::days(SESSION_CART_TTL_DAYS);
            sqlx::query_as::<_, Cart>(
                r#"
                INSERT INTO carts (id, session_id, status, expires_at)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(session_id)
            .bind(CART_STATUS_ACTIVE)
            .bind(expires_at)
            .fetch_one(pool)
            .await?
        }
    };
    Ok(cart)
}

/// Totals are always re-read from the persisted items, never accumulated,
/// so a lost read-modify-write race cannot leave them drifting.
async fn recompute_totals(pool: &DbPool, cart_id: Uuid) -> AppResult<Cart> {
    let cart = sqlx::query_as::<_, Cart>(
        r#"
        UPDATE carts SET
            item_count = COALESCE((SELECT SUM(quantity) FROM cart_items WHERE cart_id = $1), 0)::int4,
            total_amount = COALESCE((SELECT SUM(line_total) FROM cart_items WHERE cart_id = $1), 0)::int8,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(cart_id)
    .fetch_one(pool)
    .await?;
    Ok(cart)
}

async fn load_items(pool: &DbPool, cart_id: Uuid) -> AppResult<Vec<CartItemDto>> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        r#"
        SELECT ci.id, ci.product_id, ci.quantity, ci.unit_price, ci.line_total,
               p.name, p.slug, p.price, p.sale_price, p.stock_quantity,
               (SELECT url FROM product_images pi
                WHERE pi.product_id = p.id AND pi.is_primary
                ORDER BY pi.display_order LIMIT 1) AS primary_image
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at
        "#,
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
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
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        })
        .collect();
    Ok(items)
}

async fn cart_response(pool: &DbPool, cart: Cart) -> AppResult<CartResponse> {
    let items = load_items(pool, cart.id).await?;
    Ok(CartResponse { cart, items })
}

fn audit_user(identity: &ShopperIdentity) -> Option<Uuid> {
    match identity {
        ShopperIdentity::User(user_id) => Some(*user_id),
        ShopperIdentity::Session(_) => None,
    }
}

fn check_quantity_bounds(
    combined: i32,
    stock: i32,
    min_order: i32,
    max_order: Option<i32>,
) -> Result<(), AppError> {
    if combined > stock {
        return Err(AppError::Validation(format!(
            "insufficient stock: {stock} available"
        )));
    }
    if combined < min_order {
        return Err(AppError::Validation(format!(
            "minimum order quantity is {min_order}"
        )));
    }
    if let Some(max) = max_order
        && combined > max
    {
        return Err(AppError::Validation(format!(
            "maximum order quantity is {max}"
        )));
    }
    Ok(())
}

pub async fn get_cart(
    pool: &DbPool,
    identity: &ShopperIdentity,
) -> AppResult<ApiResponse<CartResponse>> {
    let cart = resolve_cart(pool, identity).await?;
    let data = cart_response(pool, cart).await?;
    Ok(ApiResponse::success("OK", data, None))
}

pub async fn add_item(
    pool: &DbPool,
    identity: &ShopperIdentity,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartResponse>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = sqlx::query_as::<_, ProductPricingRow>(
        r#"
        SELECT id, is_active, price, sale_price, stock_quantity,
               min_order_quantity, max_order_quantity
        FROM products WHERE id = $1
        "#,
    )
    .bind(payload.product_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    if !product.is_active {
        return Err(AppError::Validation("product is not available".to_string()));
    }

    let cart = resolve_cart(pool, identity).await?;

    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart.id)
            .bind(product.id)
            .fetch_optional(pool)
            .await?;

    let combined = existing.map_or(0, |(q,)| q) + payload.quantity;
    check_quantity_bounds(
        combined,
        product.stock_quantity,
        product.min_order_quantity,
        product.max_order_quantity,
    )?;

    // Price snapshot at write time: sale price when set, regular otherwise.
    let unit_price = product.sale_price.unwrap_or(product.price);
    let line_total = unit_price * i64::from(combined);

    if existing.is_some() {
        sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $3, unit_price = $4, line_total = $5, updated_at = NOW()
            WHERE cart_id = $1 AND product_id = $2
            "#,
        )
        .bind(cart.id)
        .bind(product.id)
        .bind(combined)
        .bind(unit_price)
        .bind(line_total)
        .execute(pool)
        .await?;
    } else {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cart.id)
        .bind(product.id)
        .bind(combined)
        .bind(unit_price)
        .bind(line_total)
        .execute(pool)
        .await?;
    }

    let cart = recompute_totals(pool, cart.id).await?;

    if let Err(err) = log_audit(
        pool,
        audit_user(identity),
        "cart_add_item",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": product.id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let data = cart_response(pool, cart).await?;
    Ok(ApiResponse::success("Added to cart", data, None))
}

pub async fn update_item(
    pool: &DbPool,
    identity: &ShopperIdentity,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartResponse>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }

    // Ownership-scoped lookup: the item must sit in a cart owned by the caller.
    let scope_sql = |owner_column: &str| {
        format!(
            r#"
            SELECT ci.cart_id,
                   p.stock_quantity, p.min_order_quantity, p.max_order_quantity
            FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            JOIN products p ON p.id = ci.product_id
            WHERE ci.id = $1 AND c.status = $2 AND c.{owner_column} = $3
            "#
        )
    };
    let item = match identity {
        ShopperIdentity::User(user_id) => {
            sqlx::query_as::<_, ScopedItemRow>(&scope_sql("user_id"))
                .bind(item_id)
                .bind(CART_STATUS_ACTIVE)
                .bind(user_id)
                .fetch_optional(pool)
                .await?
        }
        ShopperIdentity::Session(session_id) => {
            sqlx::query_as::<_, ScopedItemRow>(&scope_sql("session_id"))
                .bind(item_id)
                .bind(CART_STATUS_ACTIVE)
                .bind(session_id)
                .fetch_optional(pool)
                .await?
        }
    };
    let item = item.ok_or(AppError::NotFound)?;

    check_quantity_bounds(
        payload.quantity,
        item.stock_quantity,
        item.min_order_quantity,
        item.max_order_quantity,
    )?;

    // Line total is recomputed from the stored snapshot, not the live price.
    sqlx::query(
        r#"
        UPDATE cart_items
        SET quantity = $2, line_total = unit_price * $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(item_id)
    .bind(payload.quantity)
    .execute(pool)
    .await?;

    let cart = recompute_totals(pool, item.cart_id).await?;
    let data = cart_response(pool, cart).await?;
    Ok(ApiResponse::success("Cart updated", data, None))
}

pub async fn remove_item(
    pool: &DbPool,
    identity: &ShopperIdentity,
    item_id: Uuid,
) -> AppResult<()> {
    let removed: Option<(Uuid,)> = match identity {
        ShopperIdentity::User(user_id) => {
            sqlx::query_as(
                r#"
                DELETE FROM cart_items ci USING carts c
                WHERE ci.id = $1 AND ci.cart_id = c.id
                  AND c.status = $2 AND c.user_id = $3
                RETURNING ci.cart_id
                "#,
            )
            .bind(item_id)
            .bind(CART_STATUS_ACTIVE)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
        }
        ShopperIdentity::Session(session_id) => {
            sqlx::query_as(
                r#"
                DELETE FROM cart_items ci USING carts c
                WHERE ci.id = $1 AND ci.cart_id = c.id
                  AND c.status = $2 AND c.session_id = $3
                RETURNING ci.cart_id
                "#,
            )
            .bind(item_id)
            .bind(CART_STATUS_ACTIVE)
            .bind(session_id)
            .fetch_optional(pool)
            .await?
        }
    };

    let (cart_id,) = removed.ok_or(AppError::NotFound)?;
    recompute_totals(pool, cart_id).await?;

    if let Err(err) = log_audit(
        pool,
        audit_user(identity),
        "cart_remove_item",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

pub async fn clear_cart(pool: &DbPool, identity: &ShopperIdentity) -> AppResult<()> {
    let Some(cart) = find_active_cart(pool, identity).await? else {
        return Ok(());
    };

    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .execute(pool)
        .await?;
    recompute_totals(pool, cart.id).await?;

    if let Err(err) = log_audit(
        pool,
        audit_user(identity),
        "cart_clear",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_id": cart.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

/// Guest-then-login merge. The user cart wins on quantity for products present
/// in both carts; items for distinct products move over keeping their price
/// snapshot. The session cart ends up empty and marked merged.
pub async fn merge_session_cart(
    pool: &DbPool,
    user: &AuthUser,
    session_id: &str,
) -> AppResult<ApiResponse<CartResponse>> {
    let user_identity = ShopperIdentity::User(user.user_id);
    let session_identity = ShopperIdentity::Session(session_id.to_string());

    let Some(session_cart) = find_active_cart(pool, &session_identity).await? else {
        // Nothing to merge; behave like a plain cart fetch.
        return get_cart(pool, &user_identity).await;
    };

    let user_cart = resolve_cart(pool, &user_identity).await?;

    sqlx::query(
        r#"
        UPDATE cart_items SET cart_id = $1, updated_at = NOW()
        WHERE cart_id = $2
          AND product_id NOT IN (SELECT product_id FROM cart_items WHERE cart_id = $1)
        "#,
    )
    .bind(user_cart.id)
    .bind(session_cart.id)
    .execute(pool)
    .await?;

    // Collisions stay behind; drop them and retire the session cart.
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(session_cart.id)
        .execute(pool)
        .await?;
    sqlx::query(
        "UPDATE carts SET status = $2, item_count = 0, total_amount = 0, updated_at = NOW() WHERE id = $1",
    )
    .bind(session_cart.id)
    .bind(CART_STATUS_MERGED)
    .execute(pool)
    .await?;

    let cart = recompute_totals(pool, user_cart.id).await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_merge",
        Some("carts"),
        Some(serde_json::json!({ "session_cart_id": session_cart.id, "user_cart_id": cart.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let data = cart_response(pool, cart).await?;
    Ok(ApiResponse::success("Carts merged", data, None))
}
