#![forbid(unsafe_code)]

pub mod belt;
pub mod error;
pub mod mastery;
pub mod model;
pub mod scoring;
pub mod selector;
pub mod time;

pub use belt::Belt;
pub use error::Error;
pub use mastery::{MasteryRule, TopicHistory};
pub use scoring::{ScoreRecord, score_quiz};
pub use selector::next_question;
pub use time::Clock;
