//! Local-first progress tracking: points, quiz histories, demo state and
//! learner flashcards, with best-effort remote sync for signed-in users.

pub mod codec;
mod store;
mod sync;

pub use store::{DEMO_MASTERY_SNAPSHOT, ProgressStore};
pub use sync::SyncOutcome;
