//! Word-level transcript model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// One spoken word with its time span in seconds.
///
/// `id` is a client-side handle assigned at load time; it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_word_span"))]
pub struct TranscriptWord {
    #[serde(alias = "text")]
    #[validate(length(max = 100))]
    pub word: String,
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TranscriptWord {
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
            id: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when `time` falls within the word, both ends inclusive.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

fn validate_word_span(word: &TranscriptWord) -> Result<(), ValidationError> {
    if !word.start.is_finite() || !word.end.is_finite() {
        return Err(ValidationError::new("non_finite_time"));
    }
    if word.start < 0.0 {
        return Err(ValidationError::new("negative_start"));
    }
    // Zero-width words appear when a word is inserted into a gap of 0s.
    if word.start > word.end {
        return Err(ValidationError::new("start_after_end"));
    }
    Ok(())
}

/// Assign ids to words missing one and shift every timestamp so the
/// earliest `start` becomes 0.
pub fn normalize_transcript(words: &[TranscriptWord]) -> Vec<TranscriptWord> {
    let offset = words
        .iter()
        .map(|w| w.start)
        .fold(f64::INFINITY, f64::min);
    let offset = if offset.is_finite() { offset } else { 0.0 };

    words
        .iter()
        .map(|w| TranscriptWord {
            word: w.word.clone(),
            start: w.start - offset,
            end: w.end - offset,
            id: Some(w.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string())),
        })
        .collect()
}

/// Drop client-only ids before persisting.
pub fn strip_word_ids(words: &[TranscriptWord]) -> Vec<TranscriptWord> {
    words
        .iter()
        .map(|w| TranscriptWord::new(w.word.clone(), w.start, w.end))
        .collect()
}
