mod flashcard;
mod hint_settings;
mod identity;
mod ids;
mod progress;
mod question;

pub use flashcard::{Flashcard, FlashcardError};
pub use hint_settings::{
    DEFAULT_HINT_BASE_URL, DEFAULT_HINT_MODEL, HintSettings, HintSettingsDraft, SettingsError,
};
pub use identity::Identity;
pub use ids::{ParseIdError, QuestionId, TopicId, UserId};
pub use progress::{ProgressState, apply_points_delta};
pub use question::{Candidate, Catalog, CatalogError, Question};
