use std::env;
use std::path::PathBuf;

use sensei_core::model::{HintSettings, Identity, SettingsError};

use crate::hint_service::hint_settings_from_env;

/// Default location of the local cache file.
pub const DEFAULT_CACHE_PATH: &str = "sensei-cache.json";

/// Everything needed to assemble [`crate::AppServices`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicesConfig {
    /// Local cache file.
    pub cache_path: PathBuf,
    /// Remote `SQLite` URL; `None` keeps everything local.
    pub db_url: Option<String>,
    pub identity: Identity,
    /// Questions JSON; `None` uses the bundled catalog.
    pub catalog_path: Option<PathBuf>,
    pub hint: Option<HintSettings>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            db_url: None,
            identity: Identity::Anonymous,
            catalog_path: None,
            hint: None,
        }
    }
}

impl ServicesConfig {
    /// Read `SENSEI_CACHE_PATH`, `SENSEI_DB_URL`, `SENSEI_USER_ID`,
    /// `SENSEI_CATALOG` and the hint variables.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the hint base URL is invalid.
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            cache_path: non_blank("SENSEI_CACHE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH), PathBuf::from),
            db_url: non_blank("SENSEI_DB_URL"),
            identity: Identity::from_optional(non_blank("SENSEI_USER_ID").as_deref()),
            catalog_path: non_blank("SENSEI_CATALOG").map(PathBuf::from),
            hint: hint_settings_from_env()?,
        })
    }

    #[must_use]
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    #[must_use]
    pub fn with_db_url(mut self, url: impl Into<String>) -> Self {
        self.db_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }
}

fn non_blank(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
