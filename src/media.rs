//! Media ingestor: downloads Telegram file uploads into the served media
//! directory and hands out public references.

use anyhow::{Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use std::fs;
use std::path::{Path, PathBuf};
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, warn};

/// Extension used for ingested photos.
pub const PHOTO_EXTENSION: &str = "jpg";
/// Extension used for ingested videos.
pub const VIDEO_EXTENSION: &str = "mp4";

pub struct MediaStore {
    dir: PathBuf,
    base_url: String,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            dir: dir.into(),
            base_url,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Download a Telegram file and persist it under a fresh name, returning
    /// the public reference to store on the product.
    pub async fn ingest(&self, bot: &Bot, file_id: FileId, extension: &str) -> Result<String> {
        let file = bot
            .get_file(file_id)
            .await
            .context("failed to resolve file path from Telegram")?;
        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            bot.token(),
            file.path
        );

        let response = reqwest::get(&url)
            .await
            .context("failed to download media file")?
            .error_for_status()
            .context("media download rejected by Telegram")?;
        let bytes = response.bytes().await.context("failed to read media bytes")?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create media directory {}", self.dir.display()))?;

        let filename = generate_media_name(extension);
        let dest = self.dir.join(&filename);
        fs::write(&dest, &bytes)
            .with_context(|| format!("failed to write media file {}", dest.display()))?;

        debug!(file = %dest.display(), size = bytes.len(), "Media file ingested");
        Ok(format!("{}{}", self.base_url, filename))
    }

    /// Best-effort removal of the local file backing a public reference.
    /// References outside our base URL (or empty ones) are left alone, and
    /// deletion failures are logged rather than surfaced.
    pub async fn retire(&self, public_ref: &str) {
        let Some(filename) = public_ref.strip_prefix(self.base_url.as_str()) else {
            return;
        };
        if filename.is_empty() || filename.contains('/') {
            return;
        }
        let path = self.dir.join(filename);
        match fs::remove_file(&path) {
            Ok(()) => debug!(file = %path.display(), "Retired media file"),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Failed to retire media file")
            }
        }
    }
}

/// Fresh media filename: millisecond timestamp plus a random suffix, so two
/// uploads in the same millisecond cannot collide.
fn generate_media_name(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{millis}-{suffix}.{extension}")
}
