use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlashcardError {
    #[error("flashcard front must not be empty")]
    EmptyFront,
    #[error("flashcard back must not be empty")]
    EmptyBack,
}

/// Two-sided study card, either derived from a catalog question or written by the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

impl Flashcard {
    /// Build a user-authored card; both sides are trimmed and must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns `FlashcardError::EmptyFront` / `EmptyBack` for blank sides.
    pub fn new(front: &str, back: &str) -> Result<Self, FlashcardError> {
        let front = front.trim();
        let back = back.trim();
        if front.is_empty() {
            return Err(FlashcardError::EmptyFront);
        }
        if back.is_empty() {
            return Err(FlashcardError::EmptyBack);
        }
        Ok(Self {
            front: front.to_owned(),
            back: back.to_owned(),
        })
    }

    /// Card for a catalog question: the prompt up front, hint and explanation on the back.
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            front: question.prompt.clone(),
            back: format!("{} • {}", question.hint, question.why_wrong),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, TopicId};

    #[test]
    fn trims_and_validates_sides() {
        let card = Flashcard::new("  closure ", " function + scope ").unwrap();
        assert_eq!(card.front, "closure");
        assert_eq!(card.back, "function + scope");

        assert_eq!(Flashcard::new("   ", "x"), Err(FlashcardError::EmptyFront));
        assert_eq!(Flashcard::new("x", ""), Err(FlashcardError::EmptyBack));
    }

    #[test]
    fn from_question_joins_hint_and_explanation() {
        let question = Question {
            id: QuestionId::new(1),
            topic: TopicId::new("functions"),
            prompt: "What does return do?".into(),
            choices: vec!["a".into()],
            answer_index: 0,
            hint: "Think output.".into(),
            why_wrong: "It ends the function.".into(),
        };
        let card = Flashcard::from_question(&question);
        assert_eq!(card.front, "What does return do?");
        assert_eq!(card.back, "Think output. • It ends the function.");
    }
}
