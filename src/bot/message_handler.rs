//! Routing of incoming messages: command dispatch plus per-step flow routing
//! over the active dialogue state.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::context::AppContext;
use crate::dialogue::{FlowDialogue, FlowState};
use crate::localization::t_lang;

use super::commands::Command;
use super::dialogue_manager::{
    handle_add_category_text, handle_add_media, handle_add_name, handle_add_price,
    handle_category_delete_text, handle_category_new_name, handle_category_rename,
    handle_delete_name, handle_modify_category_text, handle_modify_media, handle_modify_name,
    handle_modify_value,
};
use super::ui_builder::{
    cancel_keyboard, category_action_keyboard, field_keyboard, format_product_list,
    storefront_keyboard,
};

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: FlowDialogue,
    ctx: Arc<AppContext>,
) -> Result<()> {
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.clone());
    let language_code = language_code.as_deref();

    // Uniform failure policy: a transport or storage error aborts the flow
    // with a plain notice instead of leaving the admin in a wedged step.
    if let Err(err) = dispatch_message(&bot, &msg, &dialogue, &ctx, language_code).await {
        error!(chat_id = %msg.chat.id, error = %err, "Message handling failed, aborting flow");
        let _ = bot
            .send_message(msg.chat.id, t_lang("error-generic", language_code))
            .await;
        let _ = dialogue.exit().await;
    }
    Ok(())
}

async fn dispatch_message(
    bot: &Bot,
    msg: &Message,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    language_code: Option<&str>,
) -> Result<()> {
    let is_admin = ctx.config.is_admin(msg.chat.id);

    if let Some(command) = msg.text().and_then(Command::parse) {
        return handle_command(bot, msg, dialogue, ctx, command, is_admin, language_code).await;
    }

    if !is_admin {
        // Anyone else just gets pointed at the storefront.
        send_welcome(bot, msg.chat.id, ctx, language_code).await?;
        return Ok(());
    }

    let state = dialogue.get().await?.unwrap_or_default();
    let text = msg.text().unwrap_or_default();
    let chat_id = msg.chat.id;

    match state {
        FlowState::Idle => {
            let key = if text.starts_with('/') {
                "unknown-command"
            } else {
                "not-understood"
            };
            bot.send_message(chat_id, t_lang(key, language_code)).await?;
        }
        FlowState::AddAwaitingName => {
            handle_add_name(bot, chat_id, dialogue, text, language_code).await?;
        }
        FlowState::AddAwaitingPrice { name } => {
            handle_add_price(bot, chat_id, dialogue, text, name, language_code).await?;
        }
        FlowState::AddAwaitingMedia { name, price } => {
            handle_add_media(bot, msg, dialogue, ctx, name, price, language_code).await?;
        }
        FlowState::AddAwaitingCategory {
            name,
            price,
            media_ref,
        } => {
            handle_add_category_text(
                bot, chat_id, dialogue, ctx, text, name, price, media_ref, language_code,
            )
            .await?;
        }
        // Typing instead of pressing a selection button restarts the search
        // with the new text; the flow itself stays put.
        FlowState::ModifyAwaitingName | FlowState::ModifyAwaitingSelection => {
            handle_modify_name(bot, chat_id, dialogue, ctx, text, language_code).await?;
        }
        FlowState::ModifyAwaitingField { .. } => {
            bot.send_message(chat_id, t_lang("modify-ask-field", language_code))
                .reply_markup(field_keyboard(language_code))
                .await?;
        }
        FlowState::ModifyAwaitingValue { product_id, field } => {
            handle_modify_value(
                bot, chat_id, dialogue, ctx, text, product_id, field, language_code,
            )
            .await?;
        }
        FlowState::ModifyAwaitingMedia { product_id } => {
            handle_modify_media(bot, msg, dialogue, ctx, product_id, language_code).await?;
        }
        FlowState::ModifyAwaitingCategory { product_id } => {
            handle_modify_category_text(
                bot, chat_id, dialogue, ctx, text, product_id, language_code,
            )
            .await?;
        }
        FlowState::DeleteAwaitingName | FlowState::DeleteAwaitingSelection => {
            handle_delete_name(bot, chat_id, dialogue, ctx, text, language_code).await?;
        }
        FlowState::CategoryAwaitingAction => {
            bot.send_message(chat_id, t_lang("cat-ask-action", language_code))
                .reply_markup(category_action_keyboard(language_code))
                .await?;
        }
        FlowState::CategoryAwaitingNewName => {
            handle_category_new_name(bot, chat_id, dialogue, ctx, text, language_code).await?;
        }
        FlowState::CategoryAwaitingDeleteChoice => {
            handle_category_delete_text(bot, chat_id, dialogue, ctx, text, language_code).await?;
        }
        FlowState::CategoryAwaitingRename => {
            handle_category_rename(bot, chat_id, dialogue, ctx, text, language_code).await?;
        }
    }
    Ok(())
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    dialogue: &FlowDialogue,
    ctx: &AppContext,
    command: Command,
    is_admin: bool,
    language_code: Option<&str>,
) -> Result<()> {
    if command.requires_admin() && !is_admin {
        bot.send_message(msg.chat.id, t_lang("not-authorized", language_code))
            .await?;
        return Ok(());
    }
    let chat_id = msg.chat.id;

    match command {
        Command::Start => {
            send_welcome(bot, chat_id, ctx, language_code).await?;
            dialogue.exit().await?;
        }
        Command::Help => {
            let help = [
                "help-title",
                "help-start",
                "help-add",
                "help-list",
                "help-modify",
                "help-delete",
                "help-categories",
                "help-cancel",
            ]
            .map(|key| t_lang(key, language_code))
            .join("\n");
            bot.send_message(chat_id, help).await?;
        }
        Command::Cancel => {
            let active = !matches!(
                dialogue.get().await?.unwrap_or_default(),
                FlowState::Idle
            );
            if active {
                dialogue.exit().await?;
                bot.send_message(chat_id, t_lang("cancelled", language_code))
                    .await?;
            } else {
                bot.send_message(chat_id, t_lang("no-active-flow", language_code))
                    .await?;
            }
        }
        Command::ListProducts => {
            delete_command_message(bot, msg).await;
            let snapshot = ctx.catalog.read().await?;
            bot.send_message(chat_id, format_product_list(&snapshot, language_code))
                .await?;
        }
        Command::AddProduct => {
            delete_command_message(bot, msg).await;
            bot.send_message(chat_id, t_lang("add-ask-name", language_code))
                .reply_markup(cancel_keyboard(language_code))
                .await?;
            dialogue.update(FlowState::AddAwaitingName).await?;
        }
        Command::ModifyProduct => {
            delete_command_message(bot, msg).await;
            bot.send_message(chat_id, t_lang("modify-ask-name", language_code))
                .reply_markup(cancel_keyboard(language_code))
                .await?;
            dialogue.update(FlowState::ModifyAwaitingName).await?;
        }
        Command::DeleteProduct => {
            delete_command_message(bot, msg).await;
            bot.send_message(chat_id, t_lang("delete-ask-name", language_code))
                .reply_markup(cancel_keyboard(language_code))
                .await?;
            dialogue.update(FlowState::DeleteAwaitingName).await?;
        }
        Command::Categories => {
            delete_command_message(bot, msg).await;
            bot.send_message(chat_id, t_lang("cat-ask-action", language_code))
                .reply_markup(category_action_keyboard(language_code))
                .await?;
            dialogue.update(FlowState::CategoryAwaitingAction).await?;
        }
    }
    Ok(())
}

async fn send_welcome(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &AppContext,
    language_code: Option<&str>,
) -> Result<()> {
    let url = reqwest::Url::parse(&ctx.config.storefront_url)?;
    bot.send_message(chat_id, t_lang("welcome", language_code))
        .reply_markup(storefront_keyboard(&url, language_code))
        .await?;
    Ok(())
}

/// Flow-start commands get their message removed to keep the chat tidy;
/// failures only get logged.
async fn delete_command_message(bot: &Bot, msg: &Message) {
    if let Err(err) = bot.delete_message(msg.chat.id, msg.id).await {
        debug!(chat_id = %msg.chat.id, error = %err, "Could not delete command message");
    }
}
