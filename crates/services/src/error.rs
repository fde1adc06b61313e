//! Shared error types for the services crate.

use thiserror::Error;

use sensei_core::model::{CatalogError, FlashcardError};
use storage::repository::StorageError;

/// Errors emitted by `HintService::generate`.
///
/// `HintService::hint` never surfaces these; it falls back instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HintError {
    #[error("hint generation is not configured")]
    Disabled,
    #[error("hint generation returned an empty response")]
    EmptyResponse,
    #[error("hint request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("hint request timed out")]
    Timeout,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `PracticeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error(transparent)]
    EmptyCard(#[from] FlashcardError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("could not read catalog {path}: {source}")]
    CatalogFile {
        path: String,
        source: std::io::Error,
    },
}
