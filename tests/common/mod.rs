#![allow(dead_code)]

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use storefront_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    entity::categories::{ActiveModel as CategoryActive, Model as CategoryModel},
    entity::product_categories::ActiveModel as ProductCategoryActive,
    entity::products::{ActiveModel as ProductActive, Model as ProductModel},
    middleware::auth::{AuthUser, Role},
    slug::slugify,
    state::AppState,
};
use uuid::Uuid;

/// Returns `None` (and prints a notice) when no database is configured, so
/// integration flows can be skipped in environments without Postgres.
pub async fn try_setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE cart_items, carts, wishlist_items, wishlists, product_categories, product_images, products, categories, audit_logs RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(Some(AppState { pool, orm }))
}

pub async fn seed_product(
    state: &AppState,
    name: &str,
    sku: &str,
    price: i64,
    sale_price: Option<i64>,
    stock: i32,
) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        brand: Set(None),
        model: Set(None),
        description: Set(None),
        sku: Set(sku.to_string()),
        price: Set(price),
        sale_price: Set(sale_price),
        cost: Set(None),
        stock_quantity: Set(stock),
        min_order_quantity: Set(1),
        max_order_quantity: Set(None),
        slug: Set(slugify(name)),
        is_active: Set(true),
        is_featured: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub async fn seed_category(
    state: &AppState,
    name: &str,
    display_order: i32,
) -> anyhow::Result<CategoryModel> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(slugify(name)),
        parent_id: Set(None),
        display_order: Set(display_order),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(category)
}

pub async fn link_product_category(
    state: &AppState,
    product_id: Uuid,
    category_id: Uuid,
    is_primary: bool,
) -> anyhow::Result<()> {
    ProductCategoryActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        category_id: Set(category_id),
        is_primary: Set(is_primary),
    }
    .insert(&state.orm)
    .await?;
    Ok(())
}

pub fn customer(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Customer,
    }
}

pub fn admin(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Admin,
    }
}
