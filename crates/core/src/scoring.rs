use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    #[error("score must be a finite value in [0, 1], got {provided}")]
    OutOfRange { provided: f64 },
}

//
// ─── SCORE RECORD ──────────────────────────────────────────────────────────────
//

/// Fraction of correct answers in a single quiz attempt.
///
/// Always lies in `[0, 1]`; the constructor rejects anything else, so a
/// history built from `ScoreRecord`s can be averaged without re-checking.
///
/// # Examples
///
/// ```
/// # use sensei_core::scoring::ScoreRecord;
/// let score = ScoreRecord::new(0.75)?;
/// assert_eq!(score.value(), 0.75);
/// assert!(ScoreRecord::new(75.0).is_err());
/// # Ok::<(), sensei_core::scoring::ScoreError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ScoreRecord(f64);

impl ScoreRecord {
    pub const ZERO: Self = Self(0.0);
    pub const PERFECT: Self = Self(1.0);

    /// Validate a raw fraction.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::OutOfRange` for NaN, infinities, or values outside `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, ScoreError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ScoreError::OutOfRange { provided: value })
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_perfect(self) -> bool {
        self.0 >= 1.0
    }

    /// Rounded percentage for display (`0.666..` -> `67`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl TryFrom<f64> for ScoreRecord {
    type Error = ScoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ScoreRecord> for f64 {
    fn from(score: ScoreRecord) -> Self {
        score.0
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Number of positions where the submitted answer matches the key.
///
/// `None` marks an unanswered question and never matches. Returns `0` when
/// the two slices differ in length.
#[must_use]
pub fn count_correct(answers: &[Option<usize>], key: &[usize]) -> usize {
    if answers.len() != key.len() {
        return 0;
    }
    answers
        .iter()
        .zip(key)
        .filter(|(answer, expected)| **answer == Some(**expected))
        .count()
}

/// Score a quiz attempt as `matches / key.len()`.
///
/// A length mismatch means there is nothing meaningful to compare and yields
/// a zero score, as does an empty key.
///
/// ```
/// # use sensei_core::score_quiz;
/// let score = score_quiz(&[Some(0), Some(1), Some(3)], &[0, 1, 2]);
/// assert!((score.value() - 2.0 / 3.0).abs() < f64::EPSILON);
/// assert_eq!(score_quiz(&[Some(1)], &[1, 2]).value(), 0.0);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_quiz(answers: &[Option<usize>], key: &[usize]) -> ScoreRecord {
    if key.is_empty() || answers.len() != key.len() {
        return ScoreRecord::ZERO;
    }
    let correct = count_correct(answers, key);
    ScoreRecord(correct as f64 / key.len() as f64)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
