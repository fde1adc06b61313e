#![forbid(unsafe_code)]

pub mod app_services;
pub mod bus;
pub mod config;
pub mod error;
pub mod hint_service;
pub mod practice_service;
pub mod progress;

pub use sensei_core::Clock;

pub use app_services::AppServices;
pub use bus::{ProgressBus, ProgressEvent, Subscription};
pub use config::ServicesConfig;
pub use error::{AppServicesError, HintError, PracticeError};
pub use hint_service::{HintRequest, HintService, fallback_hint};
pub use practice_service::{DiagnosticOutcome, PracticeService, QuizOutcome, TopicMastery};
pub use progress::{ProgressStore, SyncOutcome};
