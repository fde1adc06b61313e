//! String encodings for progress values kept in the local cache.
//!
//! Decoding is lenient: anything malformed reads as the empty/zero value.

use std::collections::BTreeMap;

use sensei_core::model::{Flashcard, TopicId};
use sensei_core::{ScoreRecord, TopicHistory};
use serde_json::{Map, Value};

/// Decimal integer string; absent or corrupt reads as 0.
#[must_use]
pub fn parse_points(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

#[must_use]
pub fn encode_points(points: u32) -> String {
    points.to_string()
}

/// `{"topic": [0.5, 1.0, ...]}`.
///
/// A non-object document reads as no histories, a topic whose value is not
/// an array reads as an empty history, and entries that are not numbers in
/// `[0, 1]` are dropped.
#[must_use]
pub fn parse_histories(raw: Option<&str>) -> BTreeMap<TopicId, TopicHistory> {
    let Some(Value::Object(topics)) = raw.and_then(|value| serde_json::from_str(value).ok())
    else {
        return BTreeMap::new();
    };

    topics
        .into_iter()
        .map(|(topic, scores)| {
            let history = match scores {
                Value::Array(entries) => entries
                    .iter()
                    .filter_map(Value::as_f64)
                    .filter_map(|value| ScoreRecord::new(value).ok())
                    .collect(),
                _ => TopicHistory::new(),
            };
            (TopicId::new(topic), history)
        })
        .collect()
}

/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn encode_histories(
    histories: &BTreeMap<TopicId, TopicHistory>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(histories)
}

/// `{"topic": 0.67}` as used by the demo mastery snapshot.
#[must_use]
pub fn parse_fractions(raw: Option<&str>) -> BTreeMap<TopicId, f64> {
    let Some(Value::Object(topics)) = raw.and_then(|value| serde_json::from_str(value).ok())
    else {
        return BTreeMap::new();
    };

    topics
        .into_iter()
        .filter_map(|(topic, value)| {
            let fraction = value.as_f64().filter(|v| v.is_finite())?;
            Some((TopicId::new(topic), fraction.clamp(0.0, 1.0)))
        })
        .collect()
}

/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn encode_fractions(fractions: &[(TopicId, f64)]) -> Result<String, serde_json::Error> {
    let object: Map<String, Value> = fractions
        .iter()
        .map(|(topic, fraction)| (topic.as_str().to_owned(), Value::from(*fraction)))
        .collect();
    serde_json::to_string(&Value::Object(object))
}

/// `[{"front": ..., "back": ...}]`; a corrupt document reads as no cards.
#[must_use]
pub fn parse_cards(raw: Option<&str>) -> Vec<Flashcard> {
    raw.and_then(|value| serde_json::from_str(value).ok())
        .unwrap_or_default()
}

/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn encode_cards(cards: &[Flashcard]) -> Result<String, serde_json::Error> {
    serde_json::to_string(cards)
}

/// Stored flashcard index, reset to 0 when corrupt or outside `0..deck_len`.
#[must_use]
pub fn parse_index(raw: Option<&str>, deck_len: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|index| *index < deck_len)
        .unwrap_or(0)
}
