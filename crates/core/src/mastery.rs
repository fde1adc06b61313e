use serde::{Deserialize, Serialize};

use crate::scoring::ScoreRecord;

/// Number of trailing attempts averaged by default.
pub const DEFAULT_WINDOW: usize = 3;

/// Rolling average at or above which a topic counts as mastered.
pub const DEFAULT_THRESHOLD: f64 = 0.85;

//
// ─── PURE EVALUATION ───────────────────────────────────────────────────────────
//

/// Average of the last `window` scores (fewer if the history is shorter).
///
/// Returns `0.0` for an empty history or a zero window.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rolling_average(history: &[ScoreRecord], window: usize) -> f64 {
    if history.is_empty() || window == 0 {
        return 0.0;
    }
    let start = history.len().saturating_sub(window);
    let tail = &history[start..];
    let sum = tail.iter().fold(0.0, |acc, score| acc + score.value());
    sum / tail.len() as f64
}

/// `true` iff the history is non-empty and its rolling average reaches `threshold`.
#[must_use]
pub fn is_mastered(history: &[ScoreRecord], threshold: f64, window: usize) -> bool {
    !history.is_empty() && rolling_average(history, window) >= threshold
}

//
// ─── MASTERY RULE ──────────────────────────────────────────────────────────────
//

/// Threshold and window pair used to judge mastery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryRule {
    pub threshold: f64,
    pub window: usize,
}

impl Default for MasteryRule {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Result of applying a `MasteryRule` to a history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryVerdict {
    pub average: f64,
    pub mastered: bool,
}

impl MasteryRule {
    #[must_use]
    pub fn new(threshold: f64, window: usize) -> Self {
        Self { threshold, window }
    }

    #[must_use]
    pub fn evaluate(&self, history: &[ScoreRecord]) -> MasteryVerdict {
        MasteryVerdict {
            average: rolling_average(history, self.window),
            mastered: is_mastered(history, self.threshold, self.window),
        }
    }
}

//
// ─── TOPIC HISTORY ─────────────────────────────────────────────────────────────
//

/// Ordered score history for one topic, most recent attempt last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicHistory(Vec<ScoreRecord>);

impl TopicHistory {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, score: ScoreRecord) {
        self.0.push(score);
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ScoreRecord] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<ScoreRecord> {
        self.0.last().copied()
    }

    /// Rolling average over the default window.
    #[must_use]
    pub fn average(&self) -> f64 {
        rolling_average(&self.0, DEFAULT_WINDOW)
    }

    /// Mastery verdict with the default threshold and window.
    #[must_use]
    pub fn is_mastered(&self) -> bool {
        is_mastered(&self.0, DEFAULT_THRESHOLD, DEFAULT_WINDOW)
    }
}

impl From<Vec<ScoreRecord>> for TopicHistory {
    fn from(scores: Vec<ScoreRecord>) -> Self {
        Self(scores)
    }
}

impl FromIterator<ScoreRecord> for TopicHistory {
    fn from_iter<I: IntoIterator<Item = ScoreRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(values: &[f64]) -> Vec<ScoreRecord> {
        values.iter().map(|v| ScoreRecord::new(*v).unwrap()).collect()
    }

    #[test]
    fn empty_history_averages_zero() {
        assert_eq!(rolling_average(&[], DEFAULT_WINDOW), 0.0);
        assert_eq!(rolling_average(&[], 10), 0.0);
    }

    #[test]
    fn default_window_uses_last_three() {
        let history = scores(&[0.5, 0.6, 0.7, 0.8]);
        assert!((rolling_average(&history, DEFAULT_WINDOW) - 0.7).abs() < 1e-10);
    }

    #[test]
    fn custom_window_uses_tail() {
        let history = scores(&[0.5, 0.6, 0.7, 0.8]);
        assert!((rolling_average(&history, 2) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn short_history_averages_what_exists() {
        let history = scores(&[0.4, 0.6]);
        assert!((rolling_average(&history, 5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_window_averages_zero() {
        let history = scores(&[1.0]);
        assert_eq!(rolling_average(&history, 0), 0.0);
    }

    #[test]
    fn empty_history_is_never_mastered() {
        assert!(!is_mastered(&[], DEFAULT_THRESHOLD, DEFAULT_WINDOW));
        assert!(!is_mastered(&[], 0.0, DEFAULT_WINDOW));
    }

    #[test]
    fn below_threshold_is_not_mastered() {
        let history = scores(&[0.8, 0.7, 0.6]);
        assert!(!is_mastered(&history, DEFAULT_THRESHOLD, DEFAULT_WINDOW));
    }

    #[test]
    fn exactly_threshold_is_mastered() {
        let history = scores(&[0.85, 0.85, 0.85]);
        assert!(is_mastered(&history, DEFAULT_THRESHOLD, DEFAULT_WINDOW));
    }

    #[test]
    fn average_over_window_decides() {
        let history = scores(&[0.84, 0.9, 0.9]);
        assert!(is_mastered(&history, DEFAULT_THRESHOLD, DEFAULT_WINDOW));

        // an early failure outside the window no longer counts
        let recovered = scores(&[0.0, 0.9, 0.9, 0.9]);
        assert!(is_mastered(&recovered, DEFAULT_THRESHOLD, DEFAULT_WINDOW));

        let slipping = scores(&[1.0, 1.0, 1.0, 0.3]);
        assert!(!is_mastered(&slipping, DEFAULT_THRESHOLD, DEFAULT_WINDOW));
    }

    #[test]
    fn custom_threshold_applies() {
        let history = scores(&[0.8, 0.8, 0.8]);
        assert!(is_mastered(&history, 0.8, DEFAULT_WINDOW));
        assert!(!is_mastered(&history, 0.81, DEFAULT_WINDOW));
    }

    #[test]
    fn rule_evaluates_average_and_verdict() {
        let history = scores(&[1.0, 0.5]);
        let verdict = MasteryRule::new(0.7, 2).evaluate(&history);
        assert!((verdict.average - 0.75).abs() < 1e-12);
        assert!(verdict.mastered);

        let default_verdict = MasteryRule::default().evaluate(&history);
        assert!(!default_verdict.mastered);
    }

    #[test]
    fn topic_history_uses_defaults() {
        let mut history = TopicHistory::new();
        assert!(!history.is_mastered());
        for _ in 0..3 {
            history.push(ScoreRecord::PERFECT);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.latest(), Some(ScoreRecord::PERFECT));
        assert!(history.is_mastered());
        assert_eq!(history.average(), 1.0);
    }

    #[test]
    fn topic_history_serializes_as_number_array() {
        let history: TopicHistory = scores(&[0.5, 1.0]).into();
        assert_eq!(serde_json::to_string(&history).unwrap(), "[0.5,1.0]");
    }
}
