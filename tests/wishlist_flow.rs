mod common;

use storefront_api::{
    dto::wishlist::{AddWishlistItemRequest, CreateWishlistRequest, UpdateWishlistRequest},
    error::AppError,
    services::wishlist_service,
};
use uuid::Uuid;

#[tokio::test]
async fn default_wishlist_is_created_once() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::customer(Uuid::new_v4());

    let first = wishlist_service::get_or_create_default(&state.pool, &user).await?;
    let second = wishlist_service::get_or_create_default(&state.pool, &user).await?;
    assert_eq!(first.id, second.id);
    assert_eq!(first.name, "Default Wishlist");

    let resp = wishlist_service::list_wishlists(&state.pool, &user).await?;
    assert_eq!(resp.data.unwrap().items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn default_wishlist_cannot_be_deleted_or_renamed() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::customer(Uuid::new_v4());
    let default = wishlist_service::get_or_create_default(&state.pool, &user).await?;

    let err = wishlist_service::delete_wishlist(&state.pool, &user, default.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = wishlist_service::update_wishlist(
        &state.pool,
        &user,
        default.id,
        UpdateWishlistRequest {
            name: Some("Holiday".into()),
            is_public: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Visibility can still be toggled.
    let resp = wishlist_service::update_wishlist(
        &state.pool,
        &user,
        default.id,
        UpdateWishlistRequest {
            name: None,
            is_public: Some(true),
        },
    )
    .await?;
    assert!(resp.data.unwrap().is_public);

    Ok(())
}

#[tokio::test]
async fn duplicate_add_refreshes_notes() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let user = common::customer(Uuid::new_v4());
    let product = common::seed_product(&state, "Wish Widget", "SKU-WL1", 900, None, 3).await?;
    let wishlist = wishlist_service::get_or_create_default(&state.pool, &user).await?;

    let first = wishlist_service::add_item(
        &state.pool,
        &user,
        wishlist.id,
        AddWishlistItemRequest {
            product_id: product.id,
            notes: Some("for later".into()),
        },
    )
    .await?
    .data
    .unwrap();

    let second = wishlist_service::add_item(
        &state.pool,
        &user,
        wishlist.id,
        AddWishlistItemRequest {
            product_id: product.id,
            notes: Some("birthday gift".into()),
        },
    )
    .await?
    .data
    .unwrap();

    assert_eq!(first.id, second.id, "duplicate add must not create a row");
    assert_eq!(second.notes.as_deref(), Some("birthday gift"));

    let resp = wishlist_service::get_wishlist(&state.pool, &user, wishlist.id).await?;
    assert_eq!(resp.data.unwrap().items.len(), 1);

    wishlist_service::remove_item(&state.pool, &user, wishlist.id, product.id).await?;
    let err = wishlist_service::remove_item(&state.pool, &user, wishlist.id, product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn visibility_gates_other_users() -> anyhow::Result<()> {
    let Some(state) = common::try_setup_state().await? else {
        return Ok(());
    };

    let owner = common::customer(Uuid::new_v4());
    let stranger = common::customer(Uuid::new_v4());

    let private = wishlist_service::create_wishlist(
        &state.pool,
        &owner,
        CreateWishlistRequest {
            name: "Secret".into(),
            is_public: Some(false),
        },
    )
    .await?
    .data
    .unwrap();

    let err = wishlist_service::get_wishlist(&state.pool, &stranger, private.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = wishlist_service::delete_wishlist(&state.pool, &stranger, private.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let public = wishlist_service::create_wishlist(
        &state.pool,
        &owner,
        CreateWishlistRequest {
            name: "Shared".into(),
            is_public: Some(true),
        },
    )
    .await?
    .data
    .unwrap();

    let resp = wishlist_service::get_wishlist(&state.pool, &stranger, public.id).await?;
    assert_eq!(resp.data.unwrap().wishlist.id, public.id);

    // The owner can delete a non-default list.
    wishlist_service::delete_wishlist(&state.pool, &owner, private.id).await?;

    Ok(())
}
