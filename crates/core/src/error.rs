use thiserror::Error;

use crate::model::{CatalogError, FlashcardError, SettingsError};
use crate::scoring::ScoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Flashcard(#[from] FlashcardError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
