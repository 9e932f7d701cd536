mod common;

use storefront_api::{
    dto::cart::{AddCartItemRequest, UpdateCartItemRequest},
    error::AppError,
    middleware::auth::ShopperIdentity,
    services::cart_service,
};
use uuid::Uuid;

// The canonical cart scenario: add, duplicate add, over-stock update, remove.
#[tokio::test]
async fn cart_totals_follow_item_mutations() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let product = common::seed_product(&state, "Test Widget", "SKU-W1", 2000, None, 5).await?;
    let identity = ShopperIdentity::User(Uuid::new_v4());

    // Empty cart resolves lazily with zeroed totals.
    let resp = cart_service::get_cart(&state.pool, &identity).await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.cart.item_count, 0);
    assert_eq!(cart.cart.total_amount, 0);
    assert!(cart.items.is_empty());

    // qty 2 -> count 2, total 4000
    let resp = cart_service::add_item(
        &state.pool,
        &identity,
        AddCartItemRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.cart.item_count, 2);
    assert_eq!(cart.cart.total_amount, 4000);

    // Duplicate add sums quantities on the same row instead of duplicating it.
    let resp = cart_service::add_item(
        &state.pool,
        &identity,
        AddCartItemRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.cart.item_count, 3);
    assert_eq!(cart.cart.total_amount, 6000);
    assert_eq!(cart.items.len(), 1);
    let item_id = cart.items[0].id;

    // Requesting more than stock fails and leaves the cart unchanged.
    let err = cart_service::update_item(
        &state.pool,
        &identity,
        item_id,
        UpdateCartItemRequest { quantity: 10 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let resp = cart_service::get_cart(&state.pool, &identity).await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.cart.item_count, 3);
    assert_eq!(cart.cart.total_amount, 6000);

    // Removing the last item resets both totals.
    cart_service::remove_item(&state.pool, &identity, item_id).await?;
    let resp = cart_service::get_cart(&state.pool, &identity).await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.cart.item_count, 0);
    assert_eq!(cart.cart.total_amount, 0);

    Ok(())
}

#[tokio::test]
async fn sale_price_is_snapshotted_per_line() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let product =
        common::seed_product(&state, "Sale Widget", "SKU-W2", 2000, Some(1500), 5).await?;
    let identity = ShopperIdentity::Session("sess-sale".to_string());

    let resp = cart_service::add_item(
        &state.pool,
        &identity,
        AddCartItemRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.items[0].unit_price, 1500);
    assert_eq!(cart.items[0].line_total, 3000);
    assert_eq!(cart.cart.total_amount, 3000);

    Ok(())
}

#[tokio::test]
async fn add_rejects_inactive_and_over_stock() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let product = common::seed_product(&state, "Scarce Widget", "SKU-W3", 1000, None, 2).await?;
    let identity = ShopperIdentity::Session("sess-stock".to_string());

    let err = cart_service::add_item(
        &state.pool,
        &identity,
        AddCartItemRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = cart_service::add_item(
        &state.pool,
        &identity,
        AddCartItemRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let resp = cart_service::get_cart(&state.pool, &identity).await?;
    assert_eq!(resp.data.unwrap().cart.item_count, 0);

    Ok(())
}

#[tokio::test]
async fn items_are_scoped_to_the_owning_cart() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let product = common::seed_product(&state, "Scoped Widget", "SKU-W4", 1000, None, 10).await?;
    let owner = ShopperIdentity::User(Uuid::new_v4());
    let stranger = ShopperIdentity::User(Uuid::new_v4());

    let resp = cart_service::add_item(
        &state.pool,
        &owner,
        AddCartItemRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await?;
    let item_id = resp.data.unwrap().items[0].id;

    let err = cart_service::update_item(
        &state.pool,
        &stranger,
        item_id,
        UpdateCartItemRequest { quantity: 2 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = cart_service::remove_item(&state.pool, &stranger, item_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

// Guest-then-login: user cart wins on quantity, distinct products move over.
#[tokio::test]
async fn merge_folds_session_cart_into_user_cart() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let shared = common::seed_product(&state, "Shared Widget", "SKU-M1", 1000, None, 20).await?;
    let extra = common::seed_product(&state, "Extra Widget", "SKU-M2", 500, None, 20).await?;

    let user = common::customer(Uuid::new_v4());
    let user_identity = ShopperIdentity::User(user.user_id);
    let session_identity = ShopperIdentity::Session("sess-merge".to_string());

    cart_service::add_item(
        &state.pool,
        &user_identity,
        AddCartItemRequest {
            product_id: shared.id,
            quantity: 5,
        },
    )
    .await?;
    cart_service::add_item(
        &state.pool,
        &session_identity,
        AddCartItemRequest {
            product_id: shared.id,
            quantity: 2,
        },
    )
    .await?;
    cart_service::add_item(
        &state.pool,
        &session_identity,
        AddCartItemRequest {
            product_id: extra.id,
            quantity: 1,
        },
    )
    .await?;

    let resp = cart_service::merge_session_cart(&state.pool, &user, "sess-merge").await?;
    let cart = resp.data.unwrap();

    assert_eq!(cart.items.len(), 2);
    let shared_line = cart
        .items
        .iter()
        .find(|item| item.product.id == shared.id)
        .unwrap();
    assert_eq!(shared_line.quantity, 5, "user cart wins on quantity");
    let extra_line = cart
        .items
        .iter()
        .find(|item| item.product.id == extra.id)
        .unwrap();
    assert_eq!(extra_line.quantity, 1);
    assert_eq!(cart.cart.item_count, 6);
    assert_eq!(cart.cart.total_amount, 5500);

    // The session cart is retired, so a new visit starts empty.
    let status: (String,) =
        sqlx::query_as("SELECT status FROM carts WHERE session_id = $1 AND status <> 'active'")
            .bind("sess-merge")
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(status.0, "merged");

    let resp = cart_service::get_cart(&state.pool, &session_identity).await?;
    assert_eq!(resp.data.unwrap().cart.item_count, 0);

    Ok(())
}
