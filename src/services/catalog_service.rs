use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query as SeaQuery};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{
        AddProductImageRequest, CategoryList, CreateProductRequest, ProductDetail, ProductList,
        UpdateProductRequest,
    },
    entity::{
        categories, product_categories, product_images,
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    models::{Category, Product, ProductImage},
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, ProductQuery, ProductSortBy, SortOrder},
    slug::{ProductIdentifier, slugify},
    state::AppState,
};

const RELATED_DEFAULT_LIMIT: u64 = 8;
const RELATED_MAX_LIMIT: u64 = 24;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern.clone()))
                .add(Expr::col(Column::Model).ilike(pattern)),
        );
    }

    if let Some(brand) = query.brand.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Brand.eq(brand.clone()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if query.featured == Some(true) {
        condition = condition.add(Column::IsFeatured.eq(true));
    }

    if let Some(category_slug) = query.category.as_ref().filter(|s| !s.is_empty()) {
        let category = categories::Entity::find()
            .filter(categories::Column::Slug.eq(category_slug.clone()))
            .one(&state.orm)
            .await?;
        let Some(category) = category else {
            // Unknown category filters down to an empty page.
            let meta = Meta::new(page, limit, 0);
            return Ok(ApiResponse::success(
                "Products",
                ProductList { items: vec![] },
                Some(meta),
            ));
        };
        condition = condition.add(Column::Id.in_subquery(
            SeaQuery::select()
                .column(product_categories::Column::ProductId)
                .from(product_categories::Entity)
                .and_where(
                    Expr::col(product_categories::Column::CategoryId).eq(category.id),
                )
                .to_owned(),
        ));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product_by_identifier(
    state: &AppState,
    identifier: &str,
) -> AppResult<ApiResponse<ProductDetail>> {
    let product = match ProductIdentifier::parse(identifier) {
        ProductIdentifier::Id(id) => Products::find_by_id(id).one(&state.orm).await?,
        ProductIdentifier::Slug(slug) => {
            Products::find()
                .filter(Column::Slug.eq(slug))
                .one(&state.orm)
                .await?
        }
    };
    let product = product.ok_or(AppError::NotFound)?;

    let images = product_images::Entity::find()
        .filter(product_images::Column::ProductId.eq(product.id))
        .order_by_asc(product_images::Column::DisplayOrder)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(image_from_entity)
        .collect();

    let category_rows = categories::Entity::find()
        .filter(
            categories::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(product_categories::Column::CategoryId)
                    .from(product_categories::Entity)
                    .and_where(Expr::col(product_categories::Column::ProductId).eq(product.id))
                    .to_owned(),
            ),
        )
        .order_by_asc(categories::Column::DisplayOrder)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();

    let data = ProductDetail {
        product: product_from_entity(product),
        images,
        categories: category_rows,
    };
    Ok(ApiResponse::success("Product", data, None))
}

/// Resolve a path identifier to a product id, looking the slug up when the
/// segment is not a well-formed UUID.
pub async fn resolve_product_id(state: &AppState, identifier: &str) -> AppResult<Uuid> {
    match ProductIdentifier::parse(identifier) {
        ProductIdentifier::Id(id) => Ok(id),
        ProductIdentifier::Slug(slug) => {
            let product = Products::find()
                .filter(Column::Slug.eq(slug))
                .one(&state.orm)
                .await?
                .ok_or(AppError::NotFound)?;
            Ok(product.id)
        }
    }
}

/// Other active products sharing at least one category, newest first.
pub async fn related_products(
    state: &AppState,
    product_id: Uuid,
    limit: Option<u64>,
) -> AppResult<ApiResponse<ProductList>> {
    let source = Products::find_by_id(product_id).one(&state.orm).await?;
    if source.is_none() {
        return Err(AppError::NotFound);
    }

    let limit = limit
        .unwrap_or(RELATED_DEFAULT_LIMIT)
        .clamp(1, RELATED_MAX_LIMIT);

    let shared_categories = SeaQuery::select()
        .column(product_categories::Column::CategoryId)
        .from(product_categories::Entity)
        .and_where(Expr::col(product_categories::Column::ProductId).eq(product_id))
        .to_owned();
    let sibling_products = SeaQuery::select()
        .column(product_categories::Column::ProductId)
        .from(product_categories::Entity)
        .and_where(Expr::col(product_categories::Column::CategoryId).in_subquery(shared_categories))
        .to_owned();

    let items = Products::find()
        .filter(
            Condition::all()
                .add(Column::IsActive.eq(true))
                .add(Column::Id.ne(product_id))
                .add(Column::Id.in_subquery(sibling_products)),
        )
        .order_by_desc(Column::CreatedAt)
        .limit(limit)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Related products",
        ProductList { items },
        None,
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = categories::Entity::find()
        .filter(categories::Column::IsActive.eq(true))
        .order_by_asc(categories::Column::DisplayOrder)
        .order_by_asc(categories::Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        None,
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if payload.sku.trim().is_empty() {
        return Err(AppError::Validation("sku is required".into()));
    }
    if payload.price <= 0 {
        return Err(AppError::Validation("price must be positive".into()));
    }
    if let Some(sale_price) = payload.sale_price
        && (sale_price <= 0 || sale_price >= payload.price)
    {
        return Err(AppError::Validation(
            "sale price must be positive and below the regular price".into(),
        ));
    }
    if payload.stock_quantity < 0 {
        return Err(AppError::Validation(
            "stock quantity must not be negative".into(),
        ));
    }
    let min_order = payload.min_order_quantity.unwrap_or(1);
    if min_order < 1 {
        return Err(AppError::Validation(
            "minimum order quantity must be at least 1".into(),
        ));
    }
    if let Some(max_order) = payload.max_order_quantity
        && max_order < min_order
    {
        return Err(AppError::Validation(
            "maximum order quantity must not be below the minimum".into(),
        ));
    }

    let slug = match payload.slug.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => slugify(&payload.name),
    };
    if slug.is_empty() {
        return Err(AppError::Validation(
            "a slug could not be derived from the name".into(),
        ));
    }

    let taken = Products::find()
        .filter(
            Condition::any()
                .add(Column::Sku.eq(payload.sku.clone()))
                .add(Column::Slug.eq(slug.clone())),
        )
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::Validation("sku or slug already in use".into()));
    }

    if let Some(category_ids) = payload.category_ids.as_ref().filter(|ids| !ids.is_empty()) {
        let found = categories::Entity::find()
            .filter(categories::Column::Id.is_in(category_ids.clone()))
            .count(&state.orm)
            .await?;
        if found as usize != category_ids.len() {
            return Err(AppError::Validation("unknown category id".into()));
        }
    }

    let id = Uuid::new_v4();
    let active = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        brand: Set(payload.brand),
        model: Set(payload.model),
        description: Set(payload.description),
        sku: Set(payload.sku),
        price: Set(payload.price),
        sale_price: Set(payload.sale_price),
        cost: Set(payload.cost),
        stock_quantity: Set(payload.stock_quantity),
        min_order_quantity: Set(min_order),
        max_order_quantity: Set(payload.max_order_quantity),
        slug: Set(slug),
        is_active: Set(payload.is_active.unwrap_or(true)),
        is_featured: Set(payload.is_featured.unwrap_or(false)),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Some(category_ids) = payload.category_ids.filter(|ids| !ids.is_empty()) {
        for (index, category_id) in category_ids.into_iter().enumerate() {
            product_categories::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product.id),
                category_id: Set(category_id),
                // The first category listed is the primary one.
                is_primary: Set(index == 0),
            }
            .insert(&state.orm)
            .await?;
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    // The merged field set must satisfy the same bounds as a create; a partial
    // update is checked against the values that will actually be stored.
    let price = payload.price.unwrap_or(existing.price);
    if price <= 0 {
        return Err(AppError::Validation("price must be positive".into()));
    }
    let sale_price = match payload.sale_price {
        // Zero clears the sale price; the regular price takes over.
        Some(0) => None,
        Some(sale_price) => Some(sale_price),
        None => existing.sale_price,
    };
    if let Some(sale_price) = sale_price
        && (sale_price <= 0 || sale_price >= price)
    {
        return Err(AppError::Validation(
            "sale price must be positive and below the regular price".into(),
        ));
    }
    if let Some(stock) = payload.stock_quantity
        && stock < 0
    {
        return Err(AppError::Validation(
            "stock quantity must not be negative".into(),
        ));
    }
    let min_order = payload
        .min_order_quantity
        .unwrap_or(existing.min_order_quantity);
    if min_order < 1 {
        return Err(AppError::Validation(
            "minimum order quantity must be at least 1".into(),
        ));
    }
    let max_order = payload.max_order_quantity.or(existing.max_order_quantity);
    if let Some(max_order) = max_order
        && max_order < min_order
    {
        return Err(AppError::Validation(
            "maximum order quantity must not be below the minimum".into(),
        ));
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(Some(brand));
    }
    if let Some(model) = payload.model {
        active.model = Set(Some(model));
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(cost) = payload.cost {
        active.cost = Set(Some(cost));
    }
    if let Some(stock) = payload.stock_quantity {
        active.stock_quantity = Set(stock);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    active.price = Set(price);
    active.sale_price = Set(sale_price);
    active.min_order_quantity = Set(min_order);
    active.max_order_quantity = Set(max_order);
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(())
}

pub async fn add_product_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddProductImageRequest,
) -> AppResult<ApiResponse<ProductImage>> {
    ensure_admin(user)?;

    if payload.url.trim().is_empty() {
        return Err(AppError::Validation("image url is required".into()));
    }
    let product = Products::find_by_id(product_id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let is_primary = payload.is_primary.unwrap_or(false);
    if is_primary {
        // A new primary demotes the previous one.
        product_images::Entity::update_many()
            .col_expr(product_images::Column::IsPrimary, Expr::value(false))
            .filter(product_images::Column::ProductId.eq(product_id))
            .exec(&state.orm)
            .await?;
    }

    let image = product_images::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        url: Set(payload.url),
        alt_text: Set(payload.alt_text),
        display_order: Set(payload.display_order.unwrap_or(0)),
        is_primary: Set(is_primary),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_image_add",
        Some("product_images"),
        Some(serde_json::json!({ "product_id": product_id, "image_id": image.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Image added",
        image_from_entity(image),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let threshold = query.threshold.unwrap_or(10);

    let finder = Products::find()
        .filter(
            Condition::all()
                .add(Column::IsActive.eq(true))
                .add(Column::StockQuantity.lte(threshold)),
        )
        .order_by_asc(Column::StockQuantity);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(meta),
    ))
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        brand: model.brand,
        model: model.model,
        description: model.description,
        sku: model.sku,
        price: model.price,
        sale_price: model.sale_price,
        cost: model.cost,
        stock_quantity: model.stock_quantity,
        min_order_quantity: model.min_order_quantity,
        max_order_quantity: model.max_order_quantity,
        slug: model.slug,
        is_active: model.is_active,
        is_featured: model.is_featured,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn category_from_entity(model: categories::Model) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        parent_id: model.parent_id,
        display_order: model.display_order,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn image_from_entity(model: product_images::Model) -> ProductImage {
    ProductImage {
        id: model.id,
        product_id: model.product_id,
        url: model.url,
        alt_text: model.alt_text,
        display_order: model.display_order,
        is_primary: model.is_primary,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
