use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    slug::slugify,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;
    let category_ids = seed_categories(&pool).await?;
    seed_products(&pool, &category_ids).await?;

    println!("Seed completed");
    Ok(())
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<Vec<Uuid>> {
    let categories = ["Phones", "Laptops", "Accessories"];

    let mut ids = Vec::with_capacity(categories.len());
    for (order, name) in categories.into_iter().enumerate() {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO categories (id, name, slug, display_order)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE SET display_order = EXCLUDED.display_order
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slugify(name))
        .bind(order as i32)
        .fetch_one(pool)
        .await?;
        ids.push(row.0);
    }

    println!("Seeded categories");
    Ok(ids)
}

async fn seed_products(pool: &sqlx::PgPool, category_ids: &[Uuid]) -> anyhow::Result<()> {
    // (name, brand, sku, price, sale_price, stock, category index)
    let products = [
        ("Galaxy A15", "Samsung", "PH-A15", 1_250_000_i64, Some(1_100_000_i64), 40, 0),
        ("Redmi Note 13", "Xiaomi", "PH-RN13", 980_000, None, 60, 0),
        ("ThinkPad E14", "Lenovo", "LT-E14", 4_500_000, None, 12, 1),
        ("USB-C Charger 45W", "Anker", "AC-45W", 180_000, Some(150_000), 200, 2),
    ];

    for (name, brand, sku, price, sale_price, stock, cat) in products {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, brand, sku, price, sale_price, stock_quantity, slug)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (sku) DO UPDATE SET stock_quantity = EXCLUDED.stock_quantity
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(brand)
        .bind(sku)
        .bind(price)
        .bind(sale_price)
        .bind(stock)
        .bind(slugify(name))
        .fetch_one(pool)
        .await?;

        if let Some(category_id) = category_ids.get(cat) {
            sqlx::query(
                r#"
                INSERT INTO product_categories (id, product_id, category_id, is_primary)
                VALUES ($1, $2, $3, true)
                ON CONFLICT (product_id, category_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(row.0)
            .bind(category_id)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded products");
    Ok(())
}
