//! Routing of inline-keyboard callback queries over the active dialogue
//! state. Selections edit the prompt message in place.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::context::AppContext;
use crate::dialogue::{FlowDialogue, FlowState, ProductField};
use crate::localization::{t_args_lang, t_lang};

use super::commands::{CallbackToken, CategoryAction};
use super::dialogue_manager::{
    added_message, category_deleted_message, complete_add_product, deleted_message,
    execute_category_delete, execute_delete, updated_message,
};
use super::ui_builder::{category_delete_keyboard, category_keyboard, field_keyboard};

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: FlowDialogue,
    ctx: Arc<AppContext>,
) -> Result<()> {
    let language_code = q.from.language_code.clone();
    let language_code = language_code.as_deref();

    if let Err(err) = dispatch_callback(&bot, &q, &dialogue, &ctx, language_code).await {
        error!(user_id = %q.from.id, error = %err, "Callback handling failed, aborting flow");
        if let Some(message) = &q.message {
            let _ = bot
                .send_message(message.chat().id, t_lang("error-generic", language_code))
                .await;
        }
        let _ = dialogue.exit().await;
    }

    // Always answer the query to clear the client-side loading state.
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

async fn dispatch_callback(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    language_code: Option<&str>,
) -> Result<()> {
    let Some(message) = &q.message else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    if !ctx.config.is_admin(chat_id) {
        return Ok(());
    }

    let Some(token) = q.data.as_deref().and_then(CallbackToken::parse) else {
        debug!(data = ?q.data, "Unparseable callback data ignored");
        return Ok(());
    };

    if token == CallbackToken::Cancel {
        bot.edit_message_text(chat_id, message_id, t_lang("cancelled", language_code))
            .await?;
        dialogue.exit().await?;
        return Ok(());
    }

    let state = dialogue.get().await?.unwrap_or_default();
    match (state, token) {
        (
            FlowState::AddAwaitingCategory {
                name,
                price,
                media_ref,
            },
            CallbackToken::Category(index),
        ) => {
            let snapshot = ctx.catalog.read().await?;
            match snapshot.categories.get(index).cloned() {
                Some(category) => {
                    let product =
                        complete_add_product(ctx, name, price, media_ref, category).await?;
                    bot.edit_message_text(
                        chat_id,
                        message_id,
                        added_message(&product, language_code),
                    )
                    .await?;
                    dialogue.exit().await?;
                }
                // The keyboard went stale; refresh the picker.
                None => refresh_category_picker(bot, chat_id, message_id, ctx, language_code).await?,
            }
        }
        (FlowState::AddAwaitingCategory { .. }, CallbackToken::NewCategory) => {
            // Switch the picker to a free-text prompt; the step stays put.
            bot.edit_message_text(
                chat_id,
                message_id,
                t_lang("add-ask-category-new", language_code),
            )
            .await?;
        }
        (FlowState::ModifyAwaitingSelection, CallbackToken::Product(product_id)) => {
            if ctx.catalog.read().await?.product(product_id).is_none() {
                bot.edit_message_text(
                    chat_id,
                    message_id,
                    t_lang("product-vanished", language_code),
                )
                .await?;
                dialogue.exit().await?;
                return Ok(());
            }
            bot.edit_message_text(chat_id, message_id, t_lang("modify-ask-field", language_code))
                .reply_markup(field_keyboard(language_code))
                .await?;
            dialogue
                .update(FlowState::ModifyAwaitingField { product_id })
                .await?;
        }
        (FlowState::ModifyAwaitingField { product_id }, CallbackToken::Field(field)) => {
            match field {
                ProductField::Media => {
                    bot.edit_message_text(
                        chat_id,
                        message_id,
                        t_lang("modify-ask-media", language_code),
                    )
                    .await?;
                    dialogue
                        .update(FlowState::value_step(product_id, field))
                        .await?;
                }
                ProductField::Category => {
                    let snapshot = ctx.catalog.read().await?;
                    if snapshot.categories.is_empty() {
                        bot.edit_message_text(
                            chat_id,
                            message_id,
                            t_lang("add-ask-category-new", language_code),
                        )
                        .await?;
                    } else {
                        bot.edit_message_text(
                            chat_id,
                            message_id,
                            t_lang("add-ask-category-pick", language_code),
                        )
                        .reply_markup(category_keyboard(&snapshot.categories, language_code))
                        .await?;
                    }
                    dialogue
                        .update(FlowState::value_step(product_id, field))
                        .await?;
                }
                ProductField::Name | ProductField::Price => {
                    let label = t_lang(
                        match field {
                            ProductField::Name => "field-name",
                            _ => "field-price",
                        },
                        language_code,
                    );
                    bot.edit_message_text(
                        chat_id,
                        message_id,
                        t_args_lang(
                            "modify-ask-value",
                            &[("field", label.as_str())],
                            language_code,
                        ),
                    )
                    .await?;
                    dialogue
                        .update(FlowState::value_step(product_id, field))
                        .await?;
                }
            }
        }
        (
            FlowState::ModifyAwaitingCategory { product_id },
            CallbackToken::Category(index),
        ) => {
            let snapshot = ctx.catalog.read().await?;
            match snapshot.categories.get(index).cloned() {
                Some(category) => {
                    let outcome =
                        super::dialogue_manager::apply_category_update(ctx, product_id, category)
                            .await?;
                    let text = match outcome {
                        Some(_) => {
                            updated_message(product_id, ProductField::Category, language_code)
                        }
                        None => t_lang("product-vanished", language_code),
                    };
                    bot.edit_message_text(chat_id, message_id, text).await?;
                    dialogue.exit().await?;
                }
                None => refresh_category_picker(bot, chat_id, message_id, ctx, language_code).await?,
            }
        }
        (FlowState::ModifyAwaitingCategory { .. }, CallbackToken::NewCategory) => {
            bot.edit_message_text(
                chat_id,
                message_id,
                t_lang("add-ask-category-new", language_code),
            )
            .await?;
        }
        (FlowState::DeleteAwaitingSelection, CallbackToken::Product(product_id)) => {
            let text = match execute_delete(ctx, product_id).await? {
                Some(removed) => deleted_message(&removed, language_code),
                None => t_lang("product-vanished", language_code),
            };
            bot.edit_message_text(chat_id, message_id, text).await?;
            dialogue.exit().await?;
        }
        (FlowState::CategoryAwaitingAction, CallbackToken::CategoryAction(action)) => {
            match action {
                CategoryAction::Add => {
                    bot.edit_message_text(chat_id, message_id, t_lang("cat-ask-new", language_code))
                        .await?;
                    dialogue.update(FlowState::CategoryAwaitingNewName).await?;
                }
                CategoryAction::Delete => {
                    let snapshot = ctx.catalog.read().await?;
                    if snapshot.categories.is_empty() {
                        bot.edit_message_text(
                            chat_id,
                            message_id,
                            t_lang("cat-none", language_code),
                        )
                        .await?;
                        dialogue.exit().await?;
                    } else {
                        bot.edit_message_text(
                            chat_id,
                            message_id,
                            t_lang("cat-ask-delete", language_code),
                        )
                        .reply_markup(category_delete_keyboard(
                            &snapshot.categories,
                            language_code,
                        ))
                        .await?;
                        dialogue
                            .update(FlowState::CategoryAwaitingDeleteChoice)
                            .await?;
                    }
                }
                CategoryAction::Rename => {
                    let snapshot = ctx.catalog.read().await?;
                    if snapshot.categories.is_empty() {
                        bot.edit_message_text(
                            chat_id,
                            message_id,
                            t_lang("cat-none", language_code),
                        )
                        .await?;
                        dialogue.exit().await?;
                    } else {
                        bot.edit_message_text(
                            chat_id,
                            message_id,
                            t_lang("cat-ask-rename", language_code),
                        )
                        .await?;
                        dialogue.update(FlowState::CategoryAwaitingRename).await?;
                    }
                }
            }
        }
        (FlowState::CategoryAwaitingDeleteChoice, CallbackToken::DeleteCategory(index)) => {
            let snapshot = ctx.catalog.read().await?;
            match snapshot.categories.get(index).cloned() {
                Some(name) => {
                    let text = match execute_category_delete(ctx, &name).await? {
                        Some(count) => category_deleted_message(&name, count, language_code),
                        None => {
                            t_args_lang("cat-not-found", &[("name", name.as_str())], language_code)
                        }
                    };
                    bot.edit_message_text(chat_id, message_id, text).await?;
                    dialogue.exit().await?;
                }
                None => {
                    // The keyboard went stale; refresh the delete picker.
                    if snapshot.categories.is_empty() {
                        bot.edit_message_text(chat_id, message_id, t_lang("cat-none", language_code))
                            .await?;
                        dialogue.exit().await?;
                    } else {
                        bot.edit_message_text(
                            chat_id,
                            message_id,
                            t_lang("cat-ask-delete", language_code),
                        )
                        .reply_markup(category_delete_keyboard(
                            &snapshot.categories,
                            language_code,
                        ))
                        .await?;
                    }
                }
            }
        }
        (state, token) => {
            // Stale button press from an earlier prompt; leave the step as is.
            debug!(state = ?state, token = ?token, "Callback ignored for current state");
        }
    }
    Ok(())
}

/// Re-render the category picker after a stale index, falling back to the
/// free-text prompt when no categories remain.
async fn refresh_category_picker(
    bot: &Bot,
    chat_id: ChatId,
    message_id: teloxide::types::MessageId,
    ctx: &AppContext,
    language_code: Option<&str>,
) -> Result<()> {
    let snapshot = ctx.catalog.read().await?;
    if snapshot.categories.is_empty() {
        bot.edit_message_text(
            chat_id,
            message_id,
            t_lang("add-ask-category-new", language_code),
        )
        .await?;
    } else {
        bot.edit_message_text(
            chat_id,
            message_id,
            t_lang("add-ask-category-pick", language_code),
        )
        .reply_markup(category_keyboard(&snapshot.categories, language_code))
        .await?;
    }
    Ok(())
}
