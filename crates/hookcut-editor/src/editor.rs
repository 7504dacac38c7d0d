//! Editor session: the document, the overlay controller and the layouts
//! they share, behind one action-dispatch surface.

use hookcut_models::{
    strip_word_ids, CaptionStyle, ClipEditRequest, RenderInputs, TextStyle, TextTarget,
    TranscriptWord,
};

use crate::active_words::{active_word_index, active_word_range};
use crate::controller::{
    ElementGeometry, OverlayController, OverlayScene, PointerCapture, StyleUpdate,
};
use crate::document::{DocumentChanges, DocumentStore, EditableDocument};
use crate::error::EditorResult;
use crate::frame::{place_block, FrameLayout, SelectionOverlay};
use crate::geometry::{ClampBounds, Point};
use crate::layout::{Surface, TextLayout, TextLayoutMeasurer, TextMeasurer};
use crate::progress::GenerationState;

/// Every mutation of the edited document.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    UpdateWord { index: usize, text: String },
    InsertWord { index: usize, text: String },
    DeleteWord { index: usize },
    SetHook(String),
    SetStyle { target: TextTarget, style: TextStyle },
    SetCaptionStyle(CaptionStyle),
    /// The last save succeeded.
    Commit,
}

/// Whether leaving the page would lose work or abandon a render.
pub fn should_warn_before_leave(has_changes: bool, generating: bool) -> bool {
    has_changes || generating
}

pub struct Editor<M> {
    store: DocumentStore,
    controller: OverlayController,
    layout: TextLayoutMeasurer<M>,
    time: f64,
    generation: GenerationState,
}

impl<M: TextMeasurer> Editor<M> {
    pub fn new(measurer: M, surface: Surface) -> Self {
        Self {
            store: DocumentStore::new(),
            controller: OverlayController::new(ClampBounds::default()),
            layout: TextLayoutMeasurer::new(measurer, surface),
            time: 0.0,
            generation: GenerationState::Idle,
        }
    }

    pub fn load(
        &mut self,
        transcript: &[TranscriptWord],
        hook: impl Into<String>,
        hook_style: TextStyle,
        captions_style: TextStyle,
        caption_style_id: CaptionStyle,
    ) {
        self.store
            .load(transcript, hook, hook_style, captions_style, caption_style_id);
        self.controller = OverlayController::new(ClampBounds::default());
        self.time = 0.0;
        self.generation = GenerationState::Idle;
    }

    pub fn document(&self) -> &EditableDocument {
        self.store.document()
    }

    pub fn has_changes(&self) -> bool {
        self.store.has_changes()
    }

    pub fn changes(&self) -> DocumentChanges {
        self.store.get_changes()
    }

    pub fn controller(&self) -> &OverlayController {
        &self.controller
    }

    pub fn set_time(&mut self, seconds: f64) {
        self.time = seconds;
    }

    pub fn set_surface(&mut self, surface: Surface) {
        self.layout.set_surface(surface);
    }

    pub fn generation(&self) -> &GenerationState {
        &self.generation
    }

    pub fn set_generation(&mut self, state: GenerationState) {
        self.generation = state;
    }

    pub fn should_warn_before_leave(&self) -> bool {
        should_warn_before_leave(self.has_changes(), self.generation.is_generating())
    }

    pub fn dispatch(&mut self, action: EditorAction) -> EditorResult<()> {
        match action {
            EditorAction::UpdateWord { index, text } => self.store.update_word(index, text)?,
            EditorAction::InsertWord { index, text } => self.store.insert_word(index, text)?,
            EditorAction::DeleteWord { index } => self.store.delete_word(index)?,
            EditorAction::SetHook(text) => {
                self.store.set_hook(text);
                self.reclamp(TextTarget::Hook);
            }
            EditorAction::SetStyle { target, style } => {
                self.store.set_style(target, style);
                self.reclamp(target);
            }
            EditorAction::SetCaptionStyle(style) => self.store.set_caption_style(style),
            EditorAction::Commit => self.store.commit(),
        }
        Ok(())
    }

    pub fn pointer_down(&mut self, pointer: Point) -> Option<PointerCapture> {
        let scene = self.scene();
        let response = self.controller.pointer_down(pointer, &scene);
        self.apply(response.update);
        response.capture
    }

    pub fn pointer_move(&mut self, pointer: Point) {
        let scene = self.scene();
        let response = self.controller.pointer_move(pointer, &scene);
        self.apply(response.update);
    }

    /// Pointer up, cancel or leave.
    pub fn pointer_up(&mut self) -> Option<PointerCapture> {
        let response = self.controller.pointer_up();
        self.apply(response.update);
        if let Some(target) = response.ended {
            self.reclamp(target);
        }
        response.capture
    }

    /// Current measured scene, as used for hit-testing.
    pub fn scene(&self) -> OverlayScene {
        let surface = self.layout.surface();
        let doc = self.store.document();
        let geometry = |layout: Option<TextLayout>, style: TextStyle| {
            layout.map(|l| ElementGeometry {
                style,
                bounds: l.bounds(&surface, style.position),
            })
        };
        OverlayScene {
            surface,
            hook: geometry(self.hook_layout(), doc.hook_style),
            captions: geometry(self.captions_layout(), doc.captions_style),
        }
    }

    /// What to paint for the current time and selection.
    pub fn frame(&self) -> FrameLayout {
        let surface = self.layout.surface();
        let doc = self.store.document();

        let hook = self.hook_layout().map(|layout| {
            let bounds = layout.bounds(&surface, doc.hook_style.position);
            place_block(TextTarget::Hook, &layout, bounds, None)
        });

        let range = active_word_range(self.time, &doc.transcript);
        let active = active_word_index(self.time, &doc.transcript).map(|i| i - range.start);
        let captions = self.captions_layout().map(|layout| {
            let bounds = layout.bounds(&surface, doc.captions_style.position);
            place_block(TextTarget::Captions, &layout, bounds, active)
        });

        let selection = self.controller.selected().and_then(|target| {
            let block = match target {
                TextTarget::Hook => hook.as_ref(),
                TextTarget::Captions => captions.as_ref(),
            };
            block.map(|b| SelectionOverlay::around(target, &b.bounds))
        });

        FrameLayout {
            hook,
            captions,
            selection,
        }
    }

    /// Body for the save endpoint; word ids are client-only and stripped.
    pub fn save_request(
        &self,
        render: Option<RenderInputs>,
        expected_version: Option<u64>,
    ) -> ClipEditRequest {
        let doc = self.store.document();
        ClipEditRequest {
            transcript: strip_word_ids(&doc.transcript),
            hook: doc.hook.clone(),
            hook_style: Some(doc.hook_style),
            captions_style: Some(doc.captions_style),
            caption_style_id: Some(doc.caption_style_id.id()),
            render,
            expected_version,
        }
    }

    fn hook_layout(&self) -> Option<TextLayout> {
        let doc = self.store.document();
        self.layout.hook(&doc.hook, &doc.hook_style)
    }

    fn captions_layout(&self) -> Option<TextLayout> {
        let doc = self.store.document();
        let range = active_word_range(self.time, &doc.transcript);
        self.layout.captions(
            &doc.transcript[range],
            &doc.captions_style,
            doc.caption_style_id,
        )
    }

    fn reclamp(&mut self, target: TextTarget) {
        let scene = self.scene();
        let update = self.controller.reclamp(target, &scene);
        self.apply(update);
    }

    fn apply(&mut self, update: Option<StyleUpdate>) {
        if let Some(StyleUpdate { target, style }) = update {
            self.store.set_style(target, style);
        }
    }
}
