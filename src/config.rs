//! Environment-level configuration.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use teloxide::types::ChatId;

/// Everything the bot reads from the environment, gathered once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    /// The single admin allowed to run catalog commands.
    pub admin_chat_id: i64,
    pub catalog_path: PathBuf,
    pub media_dir: PathBuf,
    /// Public URL prefix under which media files are served.
    pub media_base_url: String,
    /// Storefront front-end linked from the welcome message.
    pub storefront_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;
        let admin_chat_id = env::var("ADMIN_CHAT_ID")
            .context("ADMIN_CHAT_ID must be set")?
            .parse::<i64>()
            .context("ADMIN_CHAT_ID must be a numeric chat id")?;
        let media_base_url =
            env::var("MEDIA_BASE_URL").context("MEDIA_BASE_URL must be set")?;
        let storefront_url =
            env::var("STOREFRONT_URL").context("STOREFRONT_URL must be set")?;
        let catalog_path = env::var("CATALOG_PATH")
            .unwrap_or_else(|_| "products.json".to_string())
            .into();
        let media_dir = env::var("MEDIA_DIR")
            .unwrap_or_else(|_| "media".to_string())
            .into();

        Ok(Self {
            bot_token,
            admin_chat_id,
            catalog_path,
            media_dir,
            media_base_url,
            storefront_url,
        })
    }

    /// Admin gate: exact identity match against the configured admin chat.
    pub fn is_admin(&self, chat_id: ChatId) -> bool {
        chat_id.0 == self.admin_chat_id
    }
}
