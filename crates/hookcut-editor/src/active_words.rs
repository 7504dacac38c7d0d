//! Caption word selection for a playback time.
//!
//! Captions show fixed groups of three words. The group is chosen from the
//! word relevant at `time`, found by the first rule that matches:
//!
//! 1. a word being spoken (`start <= time <= end`),
//! 2. otherwise the next upcoming word (`time < start`),
//! 3. otherwise the last word already started.

use std::ops::Range;

use hookcut_models::TranscriptWord;

/// Words per caption group.
pub const GROUP_SIZE: usize = 3;

/// Index of the word relevant at `time`, or `None` for an empty transcript.
pub fn active_word_index(time: f64, transcript: &[TranscriptWord]) -> Option<usize> {
    transcript
        .iter()
        .position(|w| w.start <= time && time <= w.end)
        .or_else(|| transcript.iter().position(|w| time < w.start))
        .or_else(|| transcript.iter().rposition(|w| time >= w.start))
}

/// Range of the group containing the active word, clamped to the transcript.
pub fn active_word_range(time: f64, transcript: &[TranscriptWord]) -> Range<usize> {
    match active_word_index(time, transcript) {
        Some(i) => {
            let start = (i / GROUP_SIZE) * GROUP_SIZE;
            start..(start + GROUP_SIZE).min(transcript.len())
        }
        None => 0..0,
    }
}

/// The caption group to display at `time`.
pub fn active_words(time: f64, transcript: &[TranscriptWord]) -> &[TranscriptWord] {
    &transcript[active_word_range(time, transcript)]
}
