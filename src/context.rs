//! Shared handler dependencies.

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::media::MediaStore;

/// Owned stores injected into the handlers, so the flow logic never reaches
/// for ambient globals.
pub struct AppContext {
    pub config: Config,
    pub catalog: CatalogStore,
    pub media: MediaStore,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        let catalog = CatalogStore::new(&config.catalog_path);
        let media = MediaStore::new(&config.media_dir, config.media_base_url.clone());
        Self {
            config,
            catalog,
            media,
        }
    }
}
