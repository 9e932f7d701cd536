mod common;

use storefront_api::{
    dto::products::{AddProductImageRequest, CreateProductRequest, UpdateProductRequest},
    error::AppError,
    routes::params::{LowStockQuery, ProductQuery, ProductSortBy, SortOrder},
    services::catalog_service,
};
use uuid::Uuid;

fn create_request(name: &str, sku: &str, price: i64) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        brand: None,
        model: None,
        description: None,
        sku: sku.to_string(),
        price,
        sale_price: None,
        cost: None,
        stock_quantity: 10,
        min_order_quantity: None,
        max_order_quantity: None,
        slug: None,
        is_active: None,
        is_featured: None,
        category_ids: None,
    }
}

fn update_request() -> UpdateProductRequest {
    UpdateProductRequest {
        name: None,
        brand: None,
        model: None,
        description: None,
        price: None,
        sale_price: None,
        cost: None,
        stock_quantity: None,
        min_order_quantity: None,
        max_order_quantity: None,
        is_active: None,
        is_featured: None,
    }
}

fn list_query() -> ProductQuery {
    ProductQuery {
        page: None,
        per_page: None,
        q: None,
        brand: None,
        category: None,
        min_price: None,
        max_price: None,
        featured: None,
        sort_by: None,
        sort_order: None,
    }
}

#[tokio::test]
async fn identifier_dispatches_to_id_or_slug() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let admin = common::admin(Uuid::new_v4());
    let created = catalog_service::create_product(
        &state,
        &admin,
        create_request("Galaxy S24 Ultra", "SKU-CAT1", 5000),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(created.slug, "galaxy-s24-ultra", "slug derived from name");

    let by_id = catalog_service::get_product_by_identifier(&state, &created.id.to_string())
        .await?
        .data
        .unwrap();
    assert_eq!(by_id.product.id, created.id);

    let by_slug = catalog_service::get_product_by_identifier(&state, "galaxy-s24-ultra")
        .await?
        .data
        .unwrap();
    assert_eq!(by_slug.product.id, created.id);

    // A well-formed UUID never falls back to slug lookup.
    let err = catalog_service::get_product_by_identifier(&state, &Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Mutating routes resolve the same identifier forms.
    let resolved = catalog_service::resolve_product_id(&state, "galaxy-s24-ultra").await?;
    assert_eq!(resolved, created.id);
    let err = catalog_service::resolve_product_id(&state, "no-such-slug")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn list_filters_and_sorts() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let admin = common::admin(Uuid::new_v4());
    let mut cheap = create_request("Cheap Phone", "SKU-F1", 1000);
    cheap.brand = Some("Acme".into());
    let mut dear = create_request("Dear Phone", "SKU-F2", 9000);
    dear.brand = Some("Globex".into());
    let mut hidden = create_request("Hidden Phone", "SKU-F3", 5000);
    hidden.is_active = Some(false);

    catalog_service::create_product(&state, &admin, cheap).await?;
    catalog_service::create_product(&state, &admin, dear).await?;
    catalog_service::create_product(&state, &admin, hidden).await?;

    // Inactive products never surface.
    let resp = catalog_service::list_products(&state, list_query()).await?;
    let items = resp.data.unwrap().items;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|p| p.name != "Hidden Phone"));

    let mut query = list_query();
    query.brand = Some("Acme".into());
    let resp = catalog_service::list_products(&state, query).await?;
    let items = resp.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Cheap Phone");

    let mut query = list_query();
    query.min_price = Some(2000);
    let resp = catalog_service::list_products(&state, query).await?;
    assert_eq!(resp.data.unwrap().items.len(), 1);

    let mut query = list_query();
    query.sort_by = Some(ProductSortBy::Price);
    query.sort_order = Some(SortOrder::Asc);
    let resp = catalog_service::list_products(&state, query).await?;
    let items = resp.data.unwrap().items;
    assert_eq!(items[0].name, "Cheap Phone");

    let mut query = list_query();
    query.q = Some("dear".into());
    let resp = catalog_service::list_products(&state, query).await?;
    let items = resp.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Dear Phone");

    Ok(())
}

#[tokio::test]
async fn admin_gate_and_stock_validation() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let customer = common::customer(Uuid::new_v4());
    let err = catalog_service::create_product(
        &state,
        &customer,
        create_request("Nope", "SKU-G1", 1000),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let admin = common::admin(Uuid::new_v4());
    let mut bad = create_request("Bad Stock", "SKU-G2", 1000);
    bad.stock_quantity = -1;
    let err = catalog_service::create_product(&state, &admin, bad)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let created = catalog_service::create_product(
        &state,
        &admin,
        create_request("Gated Widget", "SKU-G3", 1000),
    )
    .await?
    .data
    .unwrap();

    let err = catalog_service::update_product(
        &state,
        &admin,
        created.id,
        UpdateProductRequest {
            stock_quantity: Some(-5),
            ..update_request()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // The merged field set obeys the same bounds as a create: a sale price at
    // or above the stored regular price is rejected on update too.
    let err = catalog_service::update_product(
        &state,
        &admin,
        created.id,
        UpdateProductRequest {
            sale_price: Some(5000),
            ..update_request()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Lowering the price below an existing sale price fails the same way.
    catalog_service::update_product(
        &state,
        &admin,
        created.id,
        UpdateProductRequest {
            sale_price: Some(800),
            ..update_request()
        },
    )
    .await?;
    let err = catalog_service::update_product(
        &state,
        &admin,
        created.id,
        UpdateProductRequest {
            price: Some(700),
            ..update_request()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Zero still clears the sale price.
    let cleared = catalog_service::update_product(
        &state,
        &admin,
        created.id,
        UpdateProductRequest {
            sale_price: Some(0),
            ..update_request()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cleared.sale_price, None);

    // A maximum order quantity below the (stored) minimum is rejected.
    catalog_service::update_product(
        &state,
        &admin,
        created.id,
        UpdateProductRequest {
            min_order_quantity: Some(5),
            ..update_request()
        },
    )
    .await?;
    let err = catalog_service::update_product(
        &state,
        &admin,
        created.id,
        UpdateProductRequest {
            max_order_quantity: Some(2),
            ..update_request()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Low stock is staff-only.
    let err = catalog_service::list_low_stock(
        &state,
        &customer,
        LowStockQuery {
            page: None,
            per_page: None,
            threshold: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let resp = catalog_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            page: None,
            per_page: None,
            threshold: Some(10),
        },
    )
    .await?;
    assert!(
        resp.data
            .unwrap()
            .items
            .iter()
            .any(|p| p.id == created.id)
    );

    Ok(())
}

#[tokio::test]
async fn related_products_share_a_category() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let phones = common::seed_category(&state, "Phones", 0).await?;
    let laptops = common::seed_category(&state, "Laptops", 1).await?;

    let source = common::seed_product(&state, "Source Phone", "SKU-R1", 1000, None, 5).await?;
    let sibling = common::seed_product(&state, "Sibling Phone", "SKU-R2", 1200, None, 5).await?;
    let unrelated = common::seed_product(&state, "Lone Laptop", "SKU-R3", 4000, None, 5).await?;

    common::link_product_category(&state, source.id, phones.id, true).await?;
    common::link_product_category(&state, sibling.id, phones.id, true).await?;
    common::link_product_category(&state, unrelated.id, laptops.id, true).await?;

    let resp = catalog_service::related_products(&state, source.id, None).await?;
    let items = resp.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, sibling.id, "only category siblings are related");

    // Category slug filter narrows the listing; unknown slugs yield empty pages.
    let mut query = list_query();
    query.category = Some("phones".into());
    let resp = catalog_service::list_products(&state, query).await?;
    assert_eq!(resp.data.unwrap().items.len(), 2);

    let mut query = list_query();
    query.category = Some("no-such-category".into());
    let resp = catalog_service::list_products(&state, query).await?;
    assert!(resp.data.unwrap().items.is_empty());

    let categories = catalog_service::list_categories(&state).await?.data.unwrap();
    assert_eq!(categories.items.len(), 2);
    assert_eq!(categories.items[0].name, "Phones");

    Ok(())
}

#[tokio::test]
async fn new_primary_image_demotes_previous() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let admin = common::admin(Uuid::new_v4());
    let created = catalog_service::create_product(
        &state,
        &admin,
        create_request("Pictured Widget", "SKU-I1", 1000),
    )
    .await?
    .data
    .unwrap();

    catalog_service::add_product_image(
        &state,
        &admin,
        created.id,
        AddProductImageRequest {
            url: "https://cdn.example.com/a.jpg".into(),
            alt_text: None,
            display_order: None,
            is_primary: Some(true),
        },
    )
    .await?;
    let second = catalog_service::add_product_image(
        &state,
        &admin,
        created.id,
        AddProductImageRequest {
            url: "https://cdn.example.com/b.jpg".into(),
            alt_text: None,
            display_order: Some(1),
            is_primary: Some(true),
        },
    )
    .await?
    .data
    .unwrap();

    let detail = catalog_service::get_product_by_identifier(&state, &created.id.to_string())
        .await?
        .data
        .unwrap();
    let primaries: Vec<_> = detail.images.iter().filter(|i| i.is_primary).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0].id, second.id);

    Ok(())
}
