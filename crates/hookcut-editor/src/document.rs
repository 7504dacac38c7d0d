//! Editable clip document with change tracking against the last save.

use serde::Serialize;
use uuid::Uuid;

use hookcut_models::{normalize_transcript, CaptionStyle, TextStyle, TextTarget, TranscriptWord};

use crate::error::{EditorError, EditorResult};

/// Width given to a word inserted into a wide gap or at either end.
pub const INSERTED_WORD_SPAN: f64 = 0.5;

/// Editable fields of one clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableDocument {
    pub transcript: Vec<TranscriptWord>,
    pub hook: String,
    pub hook_style: TextStyle,
    pub captions_style: TextStyle,
    pub caption_style_id: CaptionStyle,
}

impl Default for EditableDocument {
    fn default() -> Self {
        Self {
            transcript: Vec::new(),
            hook: String::new(),
            hook_style: TextStyle::default_hook(),
            captions_style: TextStyle::default_captions(),
            caption_style_id: CaptionStyle::default(),
        }
    }
}

impl EditableDocument {
    pub fn style(&self, target: TextTarget) -> &TextStyle {
        match target {
            TextTarget::Hook => &self.hook_style,
            TextTarget::Captions => &self.captions_style,
        }
    }
}

/// Fields that differ from the last saved state, each carried whole.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<TranscriptWord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_style: Option<TextStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions_style: Option<TextStyle>,
}

impl DocumentChanges {
    pub fn is_empty(&self) -> bool {
        self.transcript.is_none()
            && self.hook.is_none()
            && self.hook_style.is_none()
            && self.captions_style.is_none()
    }
}

/// Holds the document being edited and a frozen copy of the last saved one.
///
/// The saved copy only moves on [`load`](Self::load) and
/// [`commit`](Self::commit); a failed save leaves it alone so the edit can be
/// retried.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    current: EditableDocument,
    original: Option<EditableDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all state with a freshly loaded clip.
    pub fn load(
        &mut self,
        transcript: &[TranscriptWord],
        hook: impl Into<String>,
        hook_style: TextStyle,
        captions_style: TextStyle,
        caption_style_id: CaptionStyle,
    ) {
        self.current = EditableDocument {
            transcript: normalize_transcript(transcript),
            hook: hook.into(),
            hook_style,
            captions_style,
            caption_style_id,
        };
        self.original = Some(self.current.clone());
    }

    pub fn document(&self) -> &EditableDocument {
        &self.current
    }

    pub fn original(&self) -> Option<&EditableDocument> {
        self.original.as_ref()
    }

    pub fn transcript(&self) -> &[TranscriptWord] {
        &self.current.transcript
    }

    pub fn update_word(&mut self, index: usize, text: impl Into<String>) -> EditorResult<()> {
        let len = self.current.transcript.len();
        let word = self
            .current
            .transcript
            .get_mut(index)
            .ok_or(EditorError::out_of_range(index, len))?;
        word.word = text.into();
        Ok(())
    }

    /// Insert a word before `index` (`index == len` appends), with a time
    /// span synthesized from its neighbours.
    pub fn insert_word(&mut self, index: usize, text: impl Into<String>) -> EditorResult<()> {
        let transcript = &mut self.current.transcript;
        if index > transcript.len() {
            return Err(EditorError::out_of_range(index, transcript.len()));
        }
        let prev = index.checked_sub(1).and_then(|i| transcript.get(i));
        let next = transcript.get(index);
        let (start, end) = interpolate_span(prev, next);

        transcript.insert(
            index,
            TranscriptWord {
                word: text.into(),
                start,
                end,
                id: Some(Uuid::new_v4().to_string()),
            },
        );
        Ok(())
    }

    pub fn delete_word(&mut self, index: usize) -> EditorResult<()> {
        let len = self.current.transcript.len();
        if index >= len {
            return Err(EditorError::out_of_range(index, len));
        }
        self.current.transcript.remove(index);
        Ok(())
    }

    pub fn set_hook(&mut self, text: impl Into<String>) {
        self.current.hook = text.into();
    }

    pub fn set_style(&mut self, target: TextTarget, style: TextStyle) {
        match target {
            TextTarget::Hook => self.current.hook_style = style,
            TextTarget::Captions => self.current.captions_style = style,
        }
    }

    pub fn set_caption_style(&mut self, style: CaptionStyle) {
        self.current.caption_style_id = style;
    }

    /// Whether any tracked field differs from the last saved state.
    /// The caption style id is not tracked.
    pub fn has_changes(&self) -> bool {
        let Some(original) = &self.original else {
            return false;
        };
        self.current.transcript != original.transcript
            || self.current.hook != original.hook
            || self.current.hook_style != original.hook_style
            || self.current.captions_style != original.captions_style
    }

    pub fn get_changes(&self) -> DocumentChanges {
        let Some(original) = &self.original else {
            return DocumentChanges::default();
        };
        let current = &self.current;
        DocumentChanges {
            transcript: (current.transcript != original.transcript)
                .then(|| current.transcript.clone()),
            hook: (current.hook != original.hook).then(|| current.hook.clone()),
            hook_style: (current.hook_style != original.hook_style).then_some(current.hook_style),
            captions_style: (current.captions_style != original.captions_style)
                .then_some(current.captions_style),
        }
    }

    /// Mark the current state as saved. Call only after a confirmed save.
    pub fn commit(&mut self) {
        self.original = Some(self.current.clone());
    }
}

/// Time span for a word placed between `prev` and `next`.
fn interpolate_span(prev: Option<&TranscriptWord>, next: Option<&TranscriptWord>) -> (f64, f64) {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            let gap = next.start - prev.end;
            if gap > INSERTED_WORD_SPAN {
                let mid = (prev.end + next.start) / 2.0;
                (mid - INSERTED_WORD_SPAN / 2.0, mid + INSERTED_WORD_SPAN / 2.0)
            } else {
                (prev.end, next.start.max(prev.end))
            }
        }
        (None, Some(next)) => ((next.start - INSERTED_WORD_SPAN).max(0.0), next.start),
        (Some(prev), None) => (prev.end, prev.end + INSERTED_WORD_SPAN),
        (None, None) => (0.0, INSERTED_WORD_SPAN),
    }
}
