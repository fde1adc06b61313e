use std::collections::BTreeMap;

use crate::belt::Belt;
use crate::mastery::{MasteryRule, MasteryVerdict, TopicHistory};
use crate::model::ids::TopicId;
use crate::scoring::ScoreRecord;

/// Apply a signed adjustment to a points total, clamping into `0..=u32::MAX`.
///
/// ```
/// # use sensei_core::model::apply_points_delta;
/// assert_eq!(apply_points_delta(5, -10), 0);
/// assert_eq!(apply_points_delta(5, 10), 15);
/// ```
#[must_use]
pub fn apply_points_delta(current: u32, delta: i64) -> u32 {
    let next = i64::from(current).saturating_add(delta);
    u32::try_from(next.max(0)).unwrap_or(u32::MAX)
}

/// Snapshot of everything the progress store tracks for the active session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    pub points: u32,
    pub histories: BTreeMap<TopicId, TopicHistory>,
}

impl ProgressState {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn belt(&self) -> Belt {
        Belt::for_points(self.points)
    }

    /// Scores recorded for `topic`; empty if the topic was never attempted.
    #[must_use]
    pub fn history(&self, topic: &TopicId) -> &[ScoreRecord] {
        self.histories
            .get(topic)
            .map(TopicHistory::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn mastery(&self, topic: &TopicId, rule: &MasteryRule) -> MasteryVerdict {
        rule.evaluate(self.history(topic))
    }

    /// Topics whose history satisfies `rule`.
    #[must_use]
    pub fn mastered_topics(&self, rule: &MasteryRule) -> Vec<TopicId> {
        self.histories
            .iter()
            .filter(|(_, history)| rule.evaluate(history.as_slice()).mastered)
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points == 0 && self.histories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_clamps_at_zero() {
        assert_eq!(apply_points_delta(5, -10), 0);
        assert_eq!(apply_points_delta(0, -1), 0);
        assert_eq!(apply_points_delta(0, i64::MIN), 0);
    }

    #[test]
    fn delta_clamps_at_upper_bound() {
        assert_eq!(apply_points_delta(u32::MAX, 1), u32::MAX);
        assert_eq!(apply_points_delta(0, i64::MAX), u32::MAX);
    }

    #[test]
    fn empty_state_has_no_history() {
        let state = ProgressState::empty();
        assert!(state.is_empty());
        assert_eq!(state.belt(), Belt::White);
        assert!(state.history(&TopicId::new("functions")).is_empty());
    }

    #[test]
    fn mastered_topics_follow_rule() {
        let mut state = ProgressState::empty();
        state.histories.insert(
            TopicId::new("functions"),
            vec![ScoreRecord::PERFECT; 3].into(),
        );
        state.histories.insert(
            TopicId::new("async_await"),
            vec![ScoreRecord::ZERO; 3].into(),
        );
        let rule = MasteryRule::default();
        assert_eq!(state.mastered_topics(&rule), vec![TopicId::new("functions")]);
        assert!(state.mastery(&TopicId::new("functions"), &rule).mastered);
        assert!(!state.mastery(&TopicId::new("missing"), &rule).mastered);
    }
}
