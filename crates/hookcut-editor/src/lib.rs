//! Editing core for clip overlays.
//!
//! Everything here is synchronous and UI-agnostic except the render status
//! poller:
//! - [`layout`]: wrapped text metrics shared by drawing and hit-testing
//! - [`active_words`]: which caption words to show at a playback time
//! - [`controller`]: drag/resize state machine for the hook and captions
//! - [`document`]: the edited clip with change tracking
//! - [`editor`]: a session wiring the above behind one dispatch surface
//! - [`progress`]: smoothed render progress and status polling

pub mod active_words;
pub mod controller;
pub mod document;
pub mod editor;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod layout;
pub mod progress;

pub use active_words::{active_word_index, active_word_range, active_words};
pub use controller::{GestureState, OverlayController, OverlayScene, PointerCapture};
pub use document::{DocumentChanges, DocumentStore, EditableDocument};
pub use editor::{should_warn_before_leave, Editor, EditorAction};
pub use error::{EditorError, EditorResult};
pub use frame::FrameLayout;
pub use geometry::{ClampBounds, Handle, Point, Rect};
pub use layout::{FixedAdvanceMeasurer, Surface, TextLayout, TextLayoutMeasurer, TextMeasurer};
pub use progress::{ClipStatusSource, GenerationState, HttpStatusSource, StatusPoller};
