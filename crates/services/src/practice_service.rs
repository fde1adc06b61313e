use std::collections::HashSet;
use std::sync::Arc;

use sensei_core::mastery::MasteryVerdict;
use sensei_core::model::{Catalog, Flashcard, Question, QuestionId, TopicId};
use sensei_core::scoring::count_correct;
use sensei_core::{Belt, MasteryRule, ScoreRecord, next_question, score_quiz};
use tracing::info;

use crate::error::PracticeError;
use crate::progress::ProgressStore;

/// Awarded for finishing any topic quiz.
pub const QUIZ_COMPLETION_POINTS: i64 = 5;
/// Extra award for a quiz with every answer correct.
pub const PERFECT_BONUS_POINTS: i64 = 10;
/// Awarded for finishing the diagnostic.
pub const DIAGNOSTIC_POINTS: i64 = 10;
/// Awarded for writing a custom flashcard.
pub const FLASHCARD_POINTS: i64 = 20;

/// Result of grading one topic quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizOutcome {
    pub score: ScoreRecord,
    pub correct: usize,
    pub total: usize,
    /// Points total after all awards for this quiz.
    pub points: u32,
    pub previous_belt: Belt,
    pub belt: Belt,
    pub perfect: bool,
}

impl QuizOutcome {
    #[must_use]
    pub fn belt_changed(&self) -> bool {
        self.belt != self.previous_belt
    }
}

/// Result of the one-question-per-topic diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticOutcome {
    pub points: u32,
    pub previous_belt: Belt,
    pub belt: Belt,
    /// Per-topic score in question order.
    pub topic_scores: Vec<(TopicId, ScoreRecord)>,
    pub weakest: Option<TopicId>,
    pub strongest: Option<TopicId>,
}

impl DiagnosticOutcome {
    #[must_use]
    pub fn belt_upgraded(&self) -> bool {
        self.belt > self.previous_belt
    }
}

/// Mastery summary for one topic, as shown on the topics overview.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMastery {
    pub topic: TopicId,
    pub average: f64,
    pub mastered: bool,
    pub attempts: usize,
}

/// Quiz, diagnostic and flashcard flows on top of the progress store.
#[derive(Clone)]
pub struct PracticeService {
    progress: Arc<ProgressStore>,
    rule: MasteryRule,
}

impl PracticeService {
    #[must_use]
    pub fn new(progress: Arc<ProgressStore>) -> Self {
        Self::with_rule(progress, MasteryRule::default())
    }

    #[must_use]
    pub fn with_rule(progress: Arc<ProgressStore>, rule: MasteryRule) -> Self {
        Self { progress, rule }
    }

    #[must_use]
    pub fn progress(&self) -> &Arc<ProgressStore> {
        &self.progress
    }

    #[must_use]
    pub fn rule(&self) -> MasteryRule {
        self.rule
    }

    //
    // ─── QUIZZES ───────────────────────────────────────────────────────────────
    //

    /// Grade a quiz, record the score for `topic` and award points.
    ///
    /// The completion award and the perfect bonus are applied as two
    /// separate adjustments, so subscribers see both totals.
    pub fn submit_quiz(
        &self,
        topic: &TopicId,
        answers: &[Option<usize>],
        key: &[usize],
    ) -> QuizOutcome {
        let previous_belt = self.progress.belt();
        let score = score_quiz(answers, key);
        let correct = count_correct(answers, key);
        self.progress.record_quiz_attempt(topic, score);

        let mut points = self.progress.add_points(QUIZ_COMPLETION_POINTS);
        let perfect = score.is_perfect();
        if perfect {
            points = self.progress.add_points(PERFECT_BONUS_POINTS);
        }
        let belt = Belt::for_points(points);

        info!(
            topic = %topic,
            correct,
            total = key.len(),
            points,
            belt = %belt,
            "quiz submitted"
        );
        QuizOutcome {
            score,
            correct,
            total: key.len(),
            points,
            previous_belt,
            belt,
            perfect,
        }
    }

    /// Grade a quiz against the catalog's questions for `topic`.
    pub fn submit_catalog_quiz(
        &self,
        catalog: &Catalog,
        topic: &TopicId,
        answers: &[Option<usize>],
    ) -> QuizOutcome {
        self.submit_quiz(topic, answers, &catalog.answer_key(topic))
    }

    /// Indices of questions answered wrongly or left unanswered, for "retry missed".
    #[must_use]
    pub fn missed_questions(answers: &[Option<usize>], key: &[usize]) -> Vec<usize> {
        key.iter()
            .enumerate()
            .filter(|(index, expected)| answers.get(*index).copied().flatten() != Some(**expected))
            .map(|(index, _)| index)
            .collect()
    }

    //
    // ─── DIAGNOSTIC ────────────────────────────────────────────────────────────
    //

    /// Grade the diagnostic: one question per topic.
    ///
    /// Each topic's score is recorded in its history. When `answers` does not
    /// line up with `questions` every topic scores zero; the completion award
    /// is granted regardless.
    pub fn submit_diagnostic(
        &self,
        questions: &[&Question],
        answers: &[Option<usize>],
    ) -> DiagnosticOutcome {
        let previous_belt = self.progress.belt();
        let aligned = questions.len() == answers.len();

        let topic_scores: Vec<(TopicId, ScoreRecord)> = questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let correct = aligned && answers[index] == Some(question.answer_index);
                let score = if correct {
                    ScoreRecord::PERFECT
                } else {
                    ScoreRecord::ZERO
                };
                (question.topic.clone(), score)
            })
            .collect();

        for (topic, score) in &topic_scores {
            self.progress.record_quiz_attempt(topic, *score);
        }
        let points = self.progress.add_points(DIAGNOSTIC_POINTS);

        let weakest = topic_scores
            .iter()
            .reduce(|lowest, candidate| if candidate.1 < lowest.1 { candidate } else { lowest })
            .map(|(topic, _)| topic.clone());
        let strongest = topic_scores
            .iter()
            .reduce(|highest, candidate| if candidate.1 >= highest.1 { candidate } else { highest })
            .map(|(topic, _)| topic.clone());

        let belt = Belt::for_points(points);
        info!(topics = topic_scores.len(), points, belt = %belt, "diagnostic submitted");
        DiagnosticOutcome {
            points,
            previous_belt,
            belt,
            topic_scores,
            weakest,
            strongest,
        }
    }

    //
    // ─── FLASHCARDS ────────────────────────────────────────────────────────────
    //

    /// Save a learner-written card and award points; returns the new total.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::EmptyCard` for a blank side, or
    /// `PracticeError::Storage` if the card could not be saved. No points are
    /// awarded on error.
    pub fn create_flashcard(
        &self,
        topic: &TopicId,
        front: &str,
        back: &str,
    ) -> Result<u32, PracticeError> {
        let card = Flashcard::new(front, back)?;
        self.progress.add_custom_card(topic, card)?;
        let points = self.progress.add_points(FLASHCARD_POINTS);
        info!(topic = %topic, points, "custom flashcard created");
        Ok(points)
    }

    /// Catalog-derived cards for `topic` followed by the learner's own.
    #[must_use]
    pub fn flashcard_deck(&self, catalog: &Catalog, topic: &TopicId) -> Vec<Flashcard> {
        catalog
            .by_topic(topic)
            .into_iter()
            .map(Flashcard::from_question)
            .chain(self.progress.custom_cards(topic))
            .collect()
    }

    pub fn save_flashcard_position(&self, topic: &TopicId, index: usize) {
        self.progress.save_flashcard_position(topic, index);
    }

    #[must_use]
    pub fn flashcard_position(&self, topic: &TopicId, deck_len: usize) -> usize {
        self.progress.flashcard_position(topic, deck_len)
    }

    //
    // ─── MASTERY ───────────────────────────────────────────────────────────────
    //

    pub fn set_demo_mode(&self, enabled: bool) {
        self.progress.set_demo_mode(enabled);
    }

    /// Per-topic mastery in the order given.
    ///
    /// While demo mode is on, the demo snapshot overrides the displayed
    /// average for the topics it covers.
    #[must_use]
    pub fn mastery_overview(&self, topics: &[TopicId]) -> Vec<TopicMastery> {
        let histories = self.progress.histories();
        let demo = self.progress.demo_mastery();

        topics
            .iter()
            .map(|topic| {
                let history = histories.get(topic).map(|h| h.as_slice()).unwrap_or(&[]);
                let MasteryVerdict { average, mastered } = match demo.get(topic) {
                    Some(fraction) => MasteryVerdict {
                        average: *fraction,
                        mastered: *fraction >= self.rule.threshold,
                    },
                    None => self.rule.evaluate(history),
                };
                TopicMastery {
                    topic: topic.clone(),
                    average,
                    mastered,
                    attempts: history.len(),
                }
            })
            .collect()
    }

    /// Ids of every question whose topic is currently mastered.
    #[must_use]
    pub fn mastered_questions(&self, catalog: &Catalog) -> HashSet<QuestionId> {
        let mastered: HashSet<TopicId> = self
            .progress
            .snapshot()
            .mastered_topics(&self.rule)
            .into_iter()
            .collect();
        catalog
            .questions()
            .iter()
            .filter(|question| mastered.contains(&question.topic))
            .map(|question| question.id)
            .collect()
    }

    /// First question in `topic` that is not in `mastered`.
    #[must_use]
    pub fn next_question<'a>(
        catalog: &'a Catalog,
        topic: &TopicId,
        mastered: &HashSet<QuestionId>,
    ) -> Option<&'a Question> {
        let candidates = catalog.by_topic(topic);
        next_question(&candidates, mastered).copied()
    }

    /// Next question to study across the whole catalog, skipping mastered topics.
    #[must_use]
    pub fn recommend_next<'a>(&self, catalog: &'a Catalog) -> Option<&'a Question> {
        let mastered = self.mastered_questions(catalog);
        next_question(catalog.questions(), &mastered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ProgressBus;
    use sensei_core::time::fixed_clock;
    use storage::repository::Storage;

    fn service() -> PracticeService {
        let store = ProgressStore::new(Storage::in_memory(), ProgressBus::new(), fixed_clock());
        PracticeService::new(Arc::new(store))
    }

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"[
                {"id": 1, "topic": "variables_types", "prompt": "typeof null?", "choices": ["object", "null"], "answerIndex": 0, "hint": "quirk", "whyWrong": "legacy"},
                {"id": 2, "topic": "variables_types", "prompt": "const reassign?", "choices": ["yes", "no"], "answerIndex": 1, "hint": "binding", "whyWrong": "immutable binding"},
                {"id": 3, "topic": "arrays_objects", "prompt": "[].length?", "choices": ["0", "1"], "answerIndex": 0, "hint": "empty", "whyWrong": "no items"},
                {"id": 4, "topic": "loops_conditionals", "prompt": "for..of iterates?", "choices": ["values", "keys"], "answerIndex": 0, "hint": "iterables", "whyWrong": "for..in gives keys"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn perfect_quiz_awards_bonus() {
        let service = service();
        let topic = TopicId::new("functions");
        let outcome = service.submit_quiz(&topic, &[Some(0), Some(1)], &[0, 1]);

        assert!(outcome.perfect);
        assert_eq!(outcome.correct, 2);
        assert_eq!(outcome.points, 15);
        assert_eq!(outcome.belt, Belt::White);
        assert!(!outcome.belt_changed());
        assert_eq!(service.progress().history(&topic).len(), 1);
    }

    #[test]
    fn imperfect_quiz_awards_completion_only() {
        let service = service();
        let outcome = service.submit_quiz(&TopicId::new("functions"), &[Some(0), None], &[0, 1]);
        assert!(!outcome.perfect);
        assert_eq!(outcome.score.value(), 0.5);
        assert_eq!(outcome.points, 5);
    }

    #[test]
    fn mismatched_answers_score_zero_but_still_award() {
        let service = service();
        let outcome = service.submit_quiz(&TopicId::new("functions"), &[Some(0)], &[0, 1]);
        assert_eq!(outcome.score, ScoreRecord::ZERO);
        assert_eq!(outcome.correct, 0);
        assert_eq!(outcome.points, 5);
    }

    #[test]
    fn third_perfect_quiz_reaches_yellow() {
        let service = service();
        let topic = TopicId::new("functions");
        for _ in 0..2 {
            service.submit_quiz(&topic, &[Some(1)], &[1]);
        }
        let outcome = service.submit_quiz(&topic, &[Some(1)], &[1]);
        assert_eq!(outcome.points, 45);
        assert_eq!(outcome.previous_belt, Belt::White);
        assert_eq!(outcome.belt, Belt::Yellow);
        assert!(outcome.belt_changed());
    }

    #[test]
    fn catalog_quiz_uses_topic_key() {
        let service = service();
        let catalog = catalog();
        let topic = TopicId::new("variables_types");
        let outcome = service.submit_catalog_quiz(&catalog, &topic, &[Some(0), Some(1)]);
        assert!(outcome.perfect);
        assert_eq!(outcome.total, 2);
    }

    #[test]
    fn missed_questions_include_unanswered() {
        let missed = PracticeService::missed_questions(&[Some(0), None, Some(2)], &[0, 1, 1, 3]);
        assert_eq!(missed, vec![1, 2, 3]);
        assert!(PracticeService::missed_questions(&[Some(1)], &[1]).is_empty());
    }

    #[test]
    fn diagnostic_records_topics_and_picks_extremes() {
        let service = service();
        let catalog = catalog();
        let topics = catalog.topics();
        let questions = catalog.diagnostic_set(&topics);

        let outcome = service.submit_diagnostic(&questions, &[Some(1), Some(0), Some(1)]);

        assert_eq!(outcome.points, 10);
        assert_eq!(outcome.weakest, Some(TopicId::new("variables_types")));
        assert_eq!(outcome.strongest, Some(TopicId::new("arrays_objects")));
        assert_eq!(
            service.progress().history(&TopicId::new("arrays_objects")).latest(),
            Some(ScoreRecord::PERFECT)
        );
    }

    #[test]
    fn diagnostic_ties_pick_first_weakest_and_last_strongest() {
        let service = service();
        let catalog = catalog();
        let questions = catalog.diagnostic_set(&catalog.topics());

        let outcome = service.submit_diagnostic(&questions, &[Some(0), Some(0), Some(0)]);
        assert_eq!(outcome.weakest, Some(TopicId::new("variables_types")));
        assert_eq!(outcome.strongest, Some(TopicId::new("loops_conditionals")));
    }

    #[test]
    fn diagnostic_length_mismatch_scores_zero() {
        let service = service();
        let catalog = catalog();
        let questions = catalog.diagnostic_set(&catalog.topics());

        let outcome = service.submit_diagnostic(&questions, &[Some(0)]);
        assert!(outcome.topic_scores.iter().all(|(_, s)| *s == ScoreRecord::ZERO));
        assert_eq!(outcome.points, 10);
    }

    #[test]
    fn empty_diagnostic_has_no_extremes() {
        let service = service();
        let outcome = service.submit_diagnostic(&[], &[]);
        assert_eq!(outcome.weakest, None);
        assert_eq!(outcome.strongest, None);
    }

    #[test]
    fn create_flashcard_validates_and_awards() {
        let service = service();
        let catalog = catalog();
        let topic = TopicId::new("arrays_objects");

        assert!(matches!(
            service.create_flashcard(&topic, "  ", "back"),
            Err(PracticeError::EmptyCard(_))
        ));
        assert_eq!(service.progress().points(), 0);

        assert_eq!(service.create_flashcard(&topic, " map? ", " transforms ").unwrap(), 20);
        let deck = service.flashcard_deck(&catalog, &topic);
        assert_eq!(deck.len(), 2);
        assert_eq!(deck[0].front, "[].length?");
        assert_eq!(deck[1], Flashcard::new("map?", "transforms").unwrap());
    }

    #[test]
    fn flashcard_position_round_trips_through_service() {
        let service = service();
        let topic = TopicId::new("arrays_objects");
        service.save_flashcard_position(&topic, 1);
        assert_eq!(service.flashcard_position(&topic, 2), 1);
        assert_eq!(service.flashcard_position(&topic, 1), 0);
    }

    #[test]
    fn overview_reflects_history_and_demo() {
        let service = service();
        let topics = vec![TopicId::new("variables_types"), TopicId::new("arrays_objects")];
        for _ in 0..3 {
            service.submit_quiz(&topics[1], &[Some(0)], &[0]);
        }

        let overview = service.mastery_overview(&topics);
        assert_eq!(overview[0].attempts, 0);
        assert!(!overview[0].mastered);
        assert!(overview[1].mastered);
        assert_eq!(overview[1].attempts, 3);

        service.set_demo_mode(true);
        let overview = service.mastery_overview(&topics);
        assert_eq!(overview[0].average, 0.67);
        assert_eq!(overview[1].average, 0.33);
        assert!(!overview[1].mastered);
    }

    #[test]
    fn selection_skips_mastered_topics() {
        let service = service();
        let catalog = catalog();
        let vt = TopicId::new("variables_types");

        assert_eq!(service.recommend_next(&catalog).map(|q| q.id.value()), Some(1));
        for _ in 0..3 {
            service.submit_catalog_quiz(&catalog, &vt, &[Some(0), Some(1)]);
        }
        assert_eq!(service.recommend_next(&catalog).map(|q| q.id.value()), Some(3));

        let mastered: HashSet<QuestionId> = [QuestionId::new(1)].into_iter().collect();
        let next = PracticeService::next_question(&catalog, &vt, &mastered).unwrap();
        assert_eq!(next.id, QuestionId::new(2));
    }
}
