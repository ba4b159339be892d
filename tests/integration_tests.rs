//! # Integration Tests
//!
//! End-to-end coverage of the terminal flow actions against a real on-disk
//! catalog store, exercising the same functions the handlers call.

use anyhow::Result;
use tempfile::TempDir;

use vetrina::bot::dialogue_manager::{
    apply_category_update, complete_add_product, execute_category_delete, execute_delete,
};
use vetrina::catalog::UNASSIGNED_CATEGORY;
use vetrina::config::Config;
use vetrina::context::AppContext;

fn test_context(dir: &TempDir) -> AppContext {
    AppContext::new(Config {
        bot_token: "test-token".to_string(),
        admin_chat_id: 680122100,
        catalog_path: dir.path().join("products.json"),
        media_dir: dir.path().join("media"),
        media_base_url: "https://example.test/media/".to_string(),
        storefront_url: "https://shop.example.test".to_string(),
    })
}

/// Completing the add flow on an empty catalog creates the product and its
/// category in one step.
#[tokio::test]
async fn test_add_product_flow_completion() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = test_context(&dir);

    let product = complete_add_product(
        &ctx,
        "Mug".to_string(),
        "9.90".to_string(),
        "https://example.test/media/17-abc.jpg".to_string(),
        "Home".to_string(),
    )
    .await?;

    assert_eq!(product.name, "Mug");
    assert_eq!(product.price, "9.90");
    assert_eq!(product.category, "Home");
    assert!(!product.media_ref.is_empty());

    let snapshot = ctx.catalog.read().await?;
    assert_eq!(snapshot.products.len(), 1);
    assert_eq!(snapshot.categories, vec!["Home".to_string()]);
    Ok(())
}

/// Naming an existing category during the add flow does not duplicate it.
#[tokio::test]
async fn test_add_product_reuses_existing_category() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = test_context(&dir);

    complete_add_product(
        &ctx,
        "Mug".to_string(),
        "9.90".to_string(),
        String::new(),
        "Home".to_string(),
    )
    .await?;
    let second = complete_add_product(
        &ctx,
        "Bowl".to_string(),
        "5".to_string(),
        String::new(),
        "home".to_string(),
    )
    .await?;

    assert_eq!(second.category, "Home");
    let snapshot = ctx.catalog.read().await?;
    assert_eq!(snapshot.categories, vec!["Home".to_string()]);
    Ok(())
}

/// Changing one product's field leaves every other field and product intact.
#[tokio::test]
async fn test_modify_price_touches_only_target() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = test_context(&dir);

    for (name, price) in [("a", "1"), ("b", "2"), ("c", "3")] {
        complete_add_product(
            &ctx,
            name.to_string(),
            price.to_string(),
            String::new(),
            "Stock".to_string(),
        )
        .await?;
    }
    let before = ctx.catalog.read().await?;

    let updated = ctx
        .catalog
        .update(|snapshot| {
            if let Some(product) = snapshot.product_mut(3) {
                product.price = "12.50".to_string();
                true
            } else {
                false
            }
        })
        .await?;
    assert!(updated);

    let after = ctx.catalog.read().await?;
    for (prev, next) in before.products.iter().zip(after.products.iter()) {
        if prev.id == 3 {
            assert_eq!(next.price, "12.50");
            assert_eq!(next.name, prev.name);
            assert_eq!(next.category, prev.category);
            assert_eq!(next.media_ref, prev.media_ref);
        } else {
            assert_eq!(next, prev);
        }
    }
    Ok(())
}

/// Reassigning a product to a brand-new category registers the category.
#[tokio::test]
async fn test_modify_category_creates_missing_category() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = test_context(&dir);

    let product = complete_add_product(
        &ctx,
        "Mug".to_string(),
        "9.90".to_string(),
        String::new(),
        "Home".to_string(),
    )
    .await?;

    let stored = apply_category_update(&ctx, product.id, "Kitchen".to_string()).await?;
    assert_eq!(stored.as_deref(), Some("Kitchen"));

    let snapshot = ctx.catalog.read().await?;
    assert_eq!(snapshot.product(product.id).unwrap().category, "Kitchen");
    assert!(snapshot.find_category("kitchen").is_some());

    // A vanished product reports as such instead of creating the category.
    let missing = apply_category_update(&ctx, 999, "Garage".to_string()).await?;
    assert_eq!(missing, None);
    assert!(ctx.catalog.read().await?.find_category("Garage").is_none());
    Ok(())
}

/// Deleting a product removes it and retires its media file locally.
#[tokio::test]
async fn test_delete_product_retires_media() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = test_context(&dir);

    std::fs::create_dir_all(ctx.media.dir())?;
    let media_path = ctx.media.dir().join("42-xyz.jpg");
    std::fs::write(&media_path, b"jpeg bytes")?;

    let product = complete_add_product(
        &ctx,
        "Mug".to_string(),
        "9.90".to_string(),
        "https://example.test/media/42-xyz.jpg".to_string(),
        "Home".to_string(),
    )
    .await?;

    let removed = execute_delete(&ctx, product.id).await?;
    assert_eq!(removed.unwrap().name, "Mug");
    assert!(!media_path.exists());
    assert!(ctx.catalog.read().await?.products.is_empty());

    // Deleting again reports not-found rather than erroring.
    assert!(execute_delete(&ctx, product.id).await?.is_none());
    Ok(())
}

/// Deleting a category reports the number of reassigned products.
#[tokio::test]
async fn test_delete_category_reports_count() -> Result<()> {
    let dir = TempDir::new()?;
    let ctx = test_context(&dir);

    for (name, category) in [("a", "home"), ("b", "home"), ("c", "Office")] {
        ctx.catalog
            .update(|snapshot| {
                snapshot.add_product(
                    name.to_string(),
                    "1".to_string(),
                    String::new(),
                    category.to_string(),
                );
            })
            .await?;
    }
    ctx.catalog
        .update(|snapshot| {
            snapshot.ensure_category("Home");
            snapshot.ensure_category("Office");
        })
        .await?;

    let reassigned = execute_category_delete(&ctx, "Home").await?;
    assert_eq!(reassigned, Some(2));

    let snapshot = ctx.catalog.read().await?;
    assert!(snapshot.find_category("home").is_none());
    let unassigned = snapshot
        .products
        .iter()
        .filter(|p| p.category == UNASSIGNED_CATEGORY)
        .count();
    assert_eq!(unassigned, 2);
    assert_eq!(snapshot.search("c")[0].category, "Office");

    // Unknown category: no change, reported as absent, and the remaining
    // choices are still deletable on a retry.
    assert_eq!(execute_category_delete(&ctx, "Garden").await?, None);
    assert_eq!(
        ctx.catalog.read().await?.categories,
        vec!["Office".to_string()]
    );
    assert_eq!(execute_category_delete(&ctx, "Office").await?, Some(1));
    Ok(())
}
