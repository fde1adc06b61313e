use std::fs;
use std::sync::Arc;

use sensei_core::Clock;
use sensei_core::model::Catalog;
use storage::repository::Storage;
use storage::{JsonFileCache, LocalCache};
use tracing::{info, warn};

use crate::bus::ProgressBus;
use crate::config::ServicesConfig;
use crate::error::AppServicesError;
use crate::hint_service::HintService;
use crate::practice_service::PracticeService;
use crate::progress::ProgressStore;

/// Catalog shipped with the binary.
pub const BUNDLED_CATALOG: &str = include_str!("../assets/questions.json");

/// Assembles app-facing services around one progress store.
#[derive(Clone)]
pub struct AppServices {
    bus: ProgressBus,
    catalog: Arc<Catalog>,
    progress: Arc<ProgressStore>,
    practice: Arc<PracticeService>,
    hints: Arc<HintService>,
}

impl AppServices {
    /// Build services from `config`, publishing on the process-wide bus.
    ///
    /// A signed-in identity starts from the remote total; the local cache is
    /// only used when the remote cannot be read. An unreachable remote is
    /// logged and the services run local-only.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalog cannot be loaded.
    pub async fn from_config(config: ServicesConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let catalog = load_catalog(&config)?;
        let cache: Arc<dyn LocalCache> = Arc::new(JsonFileCache::open(&config.cache_path));

        let storage = match config.db_url.as_deref() {
            Some(url) => match Storage::sqlite(Arc::clone(&cache), url).await {
                Ok(storage) => {
                    info!(url, "remote progress store connected");
                    storage
                }
                Err(err) => {
                    warn!(url, error = %err, "remote progress store unavailable, running local-only");
                    Storage::local_only(cache)
                }
            },
            None => Storage::local_only(cache),
        };

        let progress = ProgressStore::new(storage, ProgressBus::global().clone(), clock);
        if config.identity.is_signed_in() {
            let points = progress.set_identity(config.identity).await;
            info!(points, "signed-in session started");
        }
        Ok(Self::assemble(
            catalog,
            progress,
            HintService::new(config.hint),
        ))
    }

    /// In-memory services for tests and embedding.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bundled catalog is invalid.
    pub fn in_memory(storage: Storage, bus: ProgressBus, clock: Clock) -> Result<Self, AppServicesError> {
        let catalog = Catalog::from_json(BUNDLED_CATALOG)?;
        let progress = ProgressStore::new(storage, bus, clock);
        Ok(Self::assemble(catalog, progress, HintService::new(None)))
    }

    fn assemble(catalog: Catalog, progress: ProgressStore, hints: HintService) -> Self {
        let bus = progress.bus().clone();
        let progress = Arc::new(progress);
        let practice = Arc::new(PracticeService::new(Arc::clone(&progress)));
        Self {
            bus,
            catalog: Arc::new(catalog),
            progress,
            practice,
            hints: Arc::new(hints),
        }
    }

    #[must_use]
    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn hints(&self) -> Arc<HintService> {
        Arc::clone(&self.hints)
    }

    /// Wait for outstanding remote writes before shutdown.
    pub async fn shutdown(&self) {
        self.progress.settle().await;
    }
}

fn load_catalog(config: &ServicesConfig) -> Result<Catalog, AppServicesError> {
    let Some(path) = &config.catalog_path else {
        return Ok(Catalog::from_json(BUNDLED_CATALOG)?);
    };
    let raw = fs::read_to_string(path).map_err(|source| AppServicesError::CatalogFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Catalog::from_json(&raw)?)
}
