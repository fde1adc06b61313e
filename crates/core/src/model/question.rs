use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, TopicId};
use crate::selector::HasQuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors raised while loading a question catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),
    #[error("question {id} has answer index {answer_index} but only {choices} choices")]
    InvalidAnswerIndex {
        id: QuestionId,
        answer_index: usize,
        choices: usize,
    },
}

//
// ─── QUESTIONS ────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as shipped in the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub topic: TopicId,
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    pub hint: String,
    pub why_wrong: String,
}

impl HasQuestionId for Question {
    fn question_id(&self) -> QuestionId {
        self.id
    }
}

/// Minimal selector input: an id and the topic it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub id: QuestionId,
    pub topic: TopicId,
}

impl Candidate {
    #[must_use]
    pub fn new(id: QuestionId, topic: TopicId) -> Self {
        Self { id, topic }
    }
}

impl HasQuestionId for Candidate {
    fn question_id(&self) -> QuestionId {
        self.id
    }
}

impl From<&Question> for Candidate {
    fn from(question: &Question) -> Self {
        Self::new(question.id, question.topic.clone())
    }
}

//
// ─── CATALOG ──────────────────────────────────────────────────────────────────
//

/// Immutable, validated list of questions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    questions: Vec<Question>,
}

impl Catalog {
    /// Build a catalog, checking ids are unique and answer indices point at a choice.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` or `CatalogError::InvalidAnswerIndex`.
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(CatalogError::DuplicateId(question.id));
            }
            if question.answer_index >= question.choices.len() {
                return Err(CatalogError::InvalidAnswerIndex {
                    id: question.id,
                    answer_index: question.answer_index,
                    choices: question.choices.len(),
                });
            }
        }
        Ok(Self { questions })
    }

    /// Parse a JSON array of questions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the JSON is malformed or fails validation.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let questions: Vec<Question> = serde_json::from_str(raw)?;
        Self::new(questions)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Questions for one topic, in catalog order.
    #[must_use]
    pub fn by_topic(&self, topic: &TopicId) -> Vec<&Question> {
        self.questions.iter().filter(|q| &q.topic == topic).collect()
    }

    /// Distinct topics in order of first appearance.
    #[must_use]
    pub fn topics(&self) -> Vec<TopicId> {
        let mut topics: Vec<TopicId> = Vec::new();
        for question in &self.questions {
            if !topics.contains(&question.topic) {
                topics.push(question.topic.clone());
            }
        }
        topics
    }

    /// Correct answer index for each question of a topic.
    #[must_use]
    pub fn answer_key(&self, topic: &TopicId) -> Vec<usize> {
        self.by_topic(topic).iter().map(|q| q.answer_index).collect()
    }

    /// First question of each listed topic, skipping topics without questions.
    #[must_use]
    pub fn diagnostic_set(&self, topics: &[TopicId]) -> Vec<&Question> {
        topics
            .iter()
            .filter_map(|topic| self.questions.iter().find(|q| &q.topic == topic))
            .collect()
    }
}
