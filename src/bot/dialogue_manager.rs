//! Flow step handlers: validate inbound input, advance or re-prompt, and run
//! the terminal catalog mutations.

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::catalog::{Product, UNASSIGNED_CATEGORY};
use crate::context::AppContext;
use crate::dialogue::{
    parse_rename_spec, validate_name, validate_price, FlowDialogue, FlowState, ProductField,
};
use crate::localization::{t_args_lang, t_lang};
use crate::media::{PHOTO_EXTENSION, VIDEO_EXTENSION};

use super::ui_builder::{
    cancel_keyboard, category_delete_keyboard, category_keyboard, field_keyboard,
    product_selection_keyboard,
};

// ---- Add-product flow ----

pub async fn handle_add_name(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    match validate_name(input) {
        Ok(name) => {
            bot.send_message(chat_id, t_lang("add-ask-price", language_code))
                .reply_markup(cancel_keyboard(language_code))
                .await?;
            dialogue.update(FlowState::AddAwaitingPrice { name }).await?;
        }
        Err("too_long") => {
            bot.send_message(chat_id, t_lang("add-name-too-long", language_code))
                .await?;
        }
        Err(_) => {
            bot.send_message(chat_id, t_lang("add-name-empty", language_code))
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_add_price(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    input: &str,
    name: String,
    language_code: Option<&str>,
) -> Result<()> {
    match validate_price(input) {
        Ok(price) => {
            bot.send_message(chat_id, t_lang("add-ask-media", language_code))
                .reply_markup(cancel_keyboard(language_code))
                .await?;
            dialogue
                .update(FlowState::AddAwaitingMedia { name, price })
                .await?;
        }
        Err(_) => {
            bot.send_message(chat_id, t_lang("add-price-invalid", language_code))
                .await?;
        }
    }
    Ok(())
}

/// A photo or video attachment is required at this step; anything else
/// re-prompts in place.
pub async fn handle_add_media(
    bot: &Bot,
    msg: &Message,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    name: String,
    price: String,
    language_code: Option<&str>,
) -> Result<()> {
    let Some((file_id, extension)) = attached_media(msg) else {
        bot.send_message(msg.chat.id, t_lang("add-media-required", language_code))
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        return Ok(());
    };

    match ctx.media.ingest(bot, file_id, extension).await {
        Ok(media_ref) => {
            prompt_category_selection(bot, msg.chat.id, ctx, language_code).await?;
            dialogue
                .update(FlowState::AddAwaitingCategory {
                    name,
                    price,
                    media_ref,
                })
                .await?;
        }
        Err(err) => {
            warn!(chat_id = %msg.chat.id, error = %err, "Media ingestion failed");
            bot.send_message(msg.chat.id, t_lang("media-download-failed", language_code))
                .await?;
        }
    }
    Ok(())
}

/// Category prompt for the add/modify flows: free text when no categories
/// exist yet, otherwise a picker with a "new category" affordance.
pub async fn prompt_category_selection(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &AppContext,
    language_code: Option<&str>,
) -> Result<()> {
    let snapshot = ctx.catalog.read().await?;
    if snapshot.categories.is_empty() {
        bot.send_message(chat_id, t_lang("add-ask-category-new", language_code))
            .reply_markup(cancel_keyboard(language_code))
            .await?;
    } else {
        bot.send_message(chat_id, t_lang("add-ask-category-pick", language_code))
            .reply_markup(category_keyboard(&snapshot.categories, language_code))
            .await?;
    }
    Ok(())
}

pub async fn handle_add_category_text(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    name: String,
    price: String,
    media_ref: String,
    language_code: Option<&str>,
) -> Result<()> {
    let Ok(category) = validate_name(input) else {
        bot.send_message(chat_id, t_lang("add-ask-category-new", language_code))
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        return Ok(());
    };
    let product = complete_add_product(ctx, name, price, media_ref, category).await?;
    bot.send_message(chat_id, added_message(&product, language_code))
        .await?;
    dialogue.exit().await?;
    Ok(())
}

/// Terminal action of the add flow: register the category (idempotently) and
/// append the product, in one critical section.
pub async fn complete_add_product(
    ctx: &AppContext,
    name: String,
    price: String,
    media_ref: String,
    category_input: String,
) -> Result<Product> {
    let product = ctx
        .catalog
        .update(move |snapshot| {
            let category = snapshot.ensure_category(&category_input);
            snapshot.add_product(name, price, media_ref, category)
        })
        .await?;
    info!(id = product.id, name = %product.name, "Product added");
    Ok(product)
}

pub fn added_message(product: &Product, language_code: Option<&str>) -> String {
    t_args_lang(
        "add-done",
        &[
            ("name", product.name.as_str()),
            ("price", product.price.as_str()),
            ("category", product.category.as_str()),
        ],
        language_code,
    )
}

// ---- Modify-product flow ----

pub async fn handle_modify_name(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let query = input.trim();
    let snapshot = ctx.catalog.read().await?;
    let matches = snapshot.find_by_exact_name(query);
    match matches.as_slice() {
        [] => {
            bot.send_message(
                chat_id,
                t_args_lang("product-none-retry", &[("query", query)], language_code),
            )
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        }
        [product] => {
            let product_id = product.id;
            bot.send_message(chat_id, t_lang("modify-ask-field", language_code))
                .reply_markup(field_keyboard(language_code))
                .await?;
            dialogue
                .update(FlowState::ModifyAwaitingField { product_id })
                .await?;
        }
        several => {
            bot.send_message(chat_id, t_lang("modify-pick", language_code))
                .reply_markup(product_selection_keyboard(several, language_code))
                .await?;
            dialogue.update(FlowState::ModifyAwaitingSelection).await?;
        }
    }
    Ok(())
}

pub async fn handle_modify_value(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    product_id: u64,
    field: ProductField,
    language_code: Option<&str>,
) -> Result<()> {
    let value = match field {
        ProductField::Name => match validate_name(input) {
            Ok(value) => value,
            Err(_) => {
                bot.send_message(chat_id, t_lang("add-name-empty", language_code))
                    .await?;
                return Ok(());
            }
        },
        ProductField::Price => match validate_price(input) {
            Ok(value) => value,
            Err(_) => {
                bot.send_message(chat_id, t_lang("add-price-invalid", language_code))
                    .await?;
                return Ok(());
            }
        },
        // Media and category have dedicated steps; if a session lands here
        // anyway, re-prompt and move it to the right one.
        ProductField::Media => {
            bot.send_message(chat_id, t_lang("modify-ask-media", language_code))
                .reply_markup(cancel_keyboard(language_code))
                .await?;
            dialogue
                .update(FlowState::value_step(product_id, field))
                .await?;
            return Ok(());
        }
        ProductField::Category => {
            prompt_category_selection(bot, chat_id, ctx, language_code).await?;
            dialogue
                .update(FlowState::value_step(product_id, field))
                .await?;
            return Ok(());
        }
    };

    let updated = ctx
        .catalog
        .update(move |snapshot| match snapshot.product_mut(product_id) {
            Some(product) => {
                match field {
                    ProductField::Name => product.name = value,
                    ProductField::Price => product.price = value,
                    ProductField::Media | ProductField::Category => {}
                }
                true
            }
            None => false,
        })
        .await?;

    if updated {
        info!(id = product_id, field = field.as_key(), "Product field updated");
        bot.send_message(chat_id, updated_message(product_id, field, language_code))
            .await?;
    } else {
        bot.send_message(chat_id, t_lang("product-vanished", language_code))
            .await?;
    }
    dialogue.exit().await?;
    Ok(())
}

pub async fn handle_modify_media(
    bot: &Bot,
    msg: &Message,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    product_id: u64,
    language_code: Option<&str>,
) -> Result<()> {
    let Some((file_id, extension)) = attached_media(msg) else {
        bot.send_message(msg.chat.id, t_lang("modify-ask-media", language_code))
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        return Ok(());
    };

    let media_ref = match ctx.media.ingest(bot, file_id, extension).await {
        Ok(media_ref) => media_ref,
        Err(err) => {
            warn!(chat_id = %msg.chat.id, error = %err, "Media ingestion failed");
            bot.send_message(msg.chat.id, t_lang("media-download-failed", language_code))
                .await?;
            return Ok(());
        }
    };

    let replaced = {
        let media_ref = media_ref.clone();
        ctx.catalog
            .update(move |snapshot| {
                snapshot
                    .product_mut(product_id)
                    .map(|product| std::mem::replace(&mut product.media_ref, media_ref))
            })
            .await?
    };

    match replaced {
        Some(old_ref) => {
            if !old_ref.is_empty() {
                ctx.media.retire(&old_ref).await;
            }
            info!(id = product_id, "Product media replaced");
            bot.send_message(
                msg.chat.id,
                updated_message(product_id, ProductField::Media, language_code),
            )
            .await?;
        }
        None => {
            // The product went away mid-flow; don't orphan the new file.
            ctx.media.retire(&media_ref).await;
            bot.send_message(msg.chat.id, t_lang("product-vanished", language_code))
                .await?;
        }
    }
    dialogue.exit().await?;
    Ok(())
}

pub async fn handle_modify_category_text(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    product_id: u64,
    language_code: Option<&str>,
) -> Result<()> {
    let Ok(category) = validate_name(input) else {
        bot.send_message(chat_id, t_lang("add-ask-category-new", language_code))
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        return Ok(());
    };
    match apply_category_update(ctx, product_id, category).await? {
        Some(_) => {
            bot.send_message(
                chat_id,
                updated_message(product_id, ProductField::Category, language_code),
            )
            .await?;
        }
        None => {
            bot.send_message(chat_id, t_lang("product-vanished", language_code))
                .await?;
        }
    }
    dialogue.exit().await?;
    Ok(())
}

/// Point a product at a category, creating the category if needed. Returns
/// the stored category name, or `None` when the product no longer exists.
pub async fn apply_category_update(
    ctx: &AppContext,
    product_id: u64,
    category_input: String,
) -> Result<Option<String>> {
    ctx.catalog
        .update(move |snapshot| {
            if snapshot.product(product_id).is_none() {
                return None;
            }
            let category = snapshot.ensure_category(&category_input);
            if let Some(product) = snapshot.product_mut(product_id) {
                product.category = category.clone();
            }
            Some(category)
        })
        .await
}

pub fn updated_message(
    product_id: u64,
    field: ProductField,
    language_code: Option<&str>,
) -> String {
    let label = t_lang(
        match field {
            ProductField::Name => "field-name",
            ProductField::Price => "field-price",
            ProductField::Media => "field-media",
            ProductField::Category => "field-category",
        },
        language_code,
    );
    let id = product_id.to_string();
    t_args_lang(
        "modify-done",
        &[("field", label.as_str()), ("id", id.as_str())],
        language_code,
    )
}

// ---- Delete-product flow ----

pub async fn handle_delete_name(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let query = input.trim();
    let snapshot = ctx.catalog.read().await?;
    let matches = snapshot.search(query);
    match matches.as_slice() {
        [] => {
            bot.send_message(
                chat_id,
                t_args_lang("delete-none-retry", &[("query", query)], language_code),
            )
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        }
        [product] => {
            let product_id = product.id;
            match execute_delete(ctx, product_id).await? {
                Some(removed) => {
                    bot.send_message(chat_id, deleted_message(&removed, language_code))
                        .await?;
                }
                None => {
                    bot.send_message(chat_id, t_lang("product-vanished", language_code))
                        .await?;
                }
            }
            dialogue.exit().await?;
        }
        several => {
            bot.send_message(chat_id, t_lang("delete-pick", language_code))
                .reply_markup(product_selection_keyboard(several, language_code))
                .await?;
            dialogue.update(FlowState::DeleteAwaitingSelection).await?;
        }
    }
    Ok(())
}

/// Terminal action of the delete flow: drop the product and retire its media.
pub async fn execute_delete(ctx: &AppContext, product_id: u64) -> Result<Option<Product>> {
    let removed = ctx
        .catalog
        .update(move |snapshot| snapshot.remove_product(product_id))
        .await?;
    if let Some(product) = &removed {
        if !product.media_ref.is_empty() {
            ctx.media.retire(&product.media_ref).await;
        }
        info!(id = product.id, name = %product.name, "Product deleted");
    }
    Ok(removed)
}

pub fn deleted_message(product: &Product, language_code: Option<&str>) -> String {
    let id = product.id.to_string();
    t_args_lang(
        "delete-done",
        &[("name", product.name.as_str()), ("id", id.as_str())],
        language_code,
    )
}

// ---- Category management flow ----

pub async fn handle_category_new_name(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let Ok(name) = validate_name(input) else {
        bot.send_message(chat_id, t_lang("cat-ask-new", language_code))
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        return Ok(());
    };

    let (stored, created) = ctx
        .catalog
        .update(move |snapshot| {
            let existed = snapshot.find_category(&name).is_some();
            let stored = snapshot.ensure_category(&name);
            (stored, !existed)
        })
        .await?;

    let key = if created { "cat-added" } else { "cat-exists" };
    bot.send_message(
        chat_id,
        t_args_lang(key, &[("name", stored.as_str())], language_code),
    )
    .await?;
    dialogue.exit().await?;
    Ok(())
}

pub async fn handle_category_delete_text(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let name = input.trim();
    match execute_category_delete(ctx, name).await? {
        Some(count) => {
            bot.send_message(chat_id, category_deleted_message(name, count, language_code))
                .await?;
            dialogue.exit().await?;
        }
        None => {
            // Unknown name: re-prompt with the current choices, flow stays.
            let snapshot = ctx.catalog.read().await?;
            if snapshot.categories.is_empty() {
                bot.send_message(chat_id, t_lang("cat-none", language_code))
                    .await?;
                dialogue.exit().await?;
            } else {
                bot.send_message(
                    chat_id,
                    t_args_lang("cat-not-found", &[("name", name)], language_code),
                )
                .reply_markup(category_delete_keyboard(
                    &snapshot.categories,
                    language_code,
                ))
                .await?;
            }
        }
    }
    Ok(())
}

/// Terminal action of the category-delete flow. Returns the number of
/// products reassigned to the sentinel, or `None` if no such category.
pub async fn execute_category_delete(ctx: &AppContext, name: &str) -> Result<Option<usize>> {
    let name = name.to_string();
    let reassigned = ctx
        .catalog
        .update(move |snapshot| snapshot.delete_category(&name))
        .await?;
    if let Some(count) = reassigned {
        info!(reassigned = count, "Category deleted");
    }
    Ok(reassigned)
}

pub fn category_deleted_message(
    name: &str,
    count: usize,
    language_code: Option<&str>,
) -> String {
    let count = count.to_string();
    t_args_lang(
        "cat-deleted",
        &[
            ("name", name),
            ("count", count.as_str()),
            ("sentinel", UNASSIGNED_CATEGORY),
        ],
        language_code,
    )
}

pub async fn handle_category_rename(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    input: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let Some((old, new)) = parse_rename_spec(input) else {
        bot.send_message(chat_id, t_lang("cat-rename-format", language_code))
            .reply_markup(cancel_keyboard(language_code))
            .await?;
        return Ok(());
    };

    let rewritten = {
        let (old, new) = (old.clone(), new.clone());
        ctx.catalog
            .update(move |snapshot| snapshot.rename_category(&old, &new))
            .await?
    };

    let message = match rewritten {
        Some(count) => {
            info!(old = %old, new = %new, rewritten = count, "Category renamed");
            let count = count.to_string();
            t_args_lang(
                "cat-renamed",
                &[
                    ("old", old.as_str()),
                    ("new", new.as_str()),
                    ("count", count.as_str()),
                ],
                language_code,
            )
        }
        None => t_args_lang("cat-not-found", &[("name", old.as_str())], language_code),
    };
    bot.send_message(chat_id, message).await?;
    dialogue.exit().await?;
    Ok(())
}

// ---- Shared helpers ----

/// Photo or video attachment on a message, with the extension to store it
/// under. Photos pick the highest-resolution variant.
pub fn attached_media(msg: &Message) -> Option<(teloxide::types::FileId, &'static str)> {
    if let Some(photos) = msg.photo() {
        if let Some(largest) = photos.last() {
            return Some((largest.file.id.clone(), PHOTO_EXTENSION));
        }
    }
    if let Some(video) = msg.video() {
        return Some((video.file.id.clone(), VIDEO_EXTENSION));
    }
    None
}
