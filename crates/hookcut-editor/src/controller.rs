//! Drag and resize state machine for the hook and captions overlays.
//!
//! The controller never owns styles. Each pointer event is evaluated against
//! an [`OverlayScene`] built from the current document and the same layouts
//! that are drawn, and returns the style updates to apply.

use hookcut_models::style::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use hookcut_models::{TextPosition, TextStyle, TextTarget};
use tracing::trace;

use crate::geometry::{clamp_position, hit_handle, ClampBounds, Handle, Point, Rect};
use crate::layout::Surface;

/// Exponent applied to the pointer distance ratio when resizing.
pub const RESIZE_EXPONENT: f64 = 0.8;

/// Measured state of one element for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementGeometry {
    pub style: TextStyle,
    /// Measured text block in surface pixels.
    pub bounds: Rect,
}

/// Everything hit-testing needs: the surface and both elements, `None` when
/// an element has nothing to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayScene {
    pub surface: Surface,
    pub hook: Option<ElementGeometry>,
    pub captions: Option<ElementGeometry>,
}

impl OverlayScene {
    pub fn element(&self, target: TextTarget) -> Option<&ElementGeometry> {
        match target {
            TextTarget::Hook => self.hook.as_ref(),
            TextTarget::Captions => self.captions.as_ref(),
        }
    }
}

/// Pointer offset from the element centre at drag start, percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragOffset {
    pub dx: f64,
    pub dy: f64,
}

/// Fixed reference for a whole resize gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSnapshot {
    /// Pointer position on the handle at resize start, px.
    pub handle_position: Point,
    pub font_size: f64,
    /// Element centre at resize start, px.
    pub text_position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        target: TextTarget,
        offset: DragOffset,
    },
    Resizing {
        target: TextTarget,
        handle: Handle,
        initial: ResizeSnapshot,
    },
}

impl GestureState {
    pub fn target(&self) -> Option<TextTarget> {
        match self {
            GestureState::Idle => None,
            GestureState::Dragging { target, .. } | GestureState::Resizing { target, .. } => {
                Some(*target)
            }
        }
    }
}

/// Pointer capture request for the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCapture {
    Acquire,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleUpdate {
    pub target: TextTarget,
    pub style: TextStyle,
}

/// Result of one pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerResponse {
    pub update: Option<StyleUpdate>,
    pub capture: Option<PointerCapture>,
    /// Set when a gesture on this target just finished.
    pub ended: Option<TextTarget>,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayController {
    state: GestureState,
    selected: Option<TextTarget>,
    bounds: ClampBounds,
}

impl OverlayController {
    pub fn new(bounds: ClampBounds) -> Self {
        Self {
            state: GestureState::Idle,
            selected: None,
            bounds,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn selected(&self) -> Option<TextTarget> {
        self.selected
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    pub fn clear_selection(&mut self) {
        if !self.is_active() {
            self.selected = None;
        }
    }

    pub fn pointer_down(&mut self, pointer: Point, scene: &OverlayScene) -> PointerResponse {
        if self.is_active() {
            return PointerResponse::default();
        }

        if let Some(target) = self.selected {
            if let Some(element) = scene.element(target) {
                if let Some(handle) = hit_handle(&element.bounds, pointer) {
                    self.state = GestureState::Resizing {
                        target,
                        handle,
                        initial: ResizeSnapshot {
                            handle_position: pointer,
                            font_size: element.style.font_size,
                            text_position: scene.surface.to_absolute(element.style.position),
                        },
                    };
                    trace!(%target, ?handle, "resize started");
                    return acquire();
                }
            }
        }

        for target in [TextTarget::Hook, TextTarget::Captions] {
            let Some(element) = scene.element(target) else {
                continue;
            };
            if element.bounds.contains(pointer) {
                let p = scene.surface.to_percent(pointer);
                self.state = GestureState::Dragging {
                    target,
                    offset: DragOffset {
                        dx: p.x - element.style.position.x,
                        dy: p.y - element.style.position.y,
                    },
                };
                self.selected = Some(target);
                trace!(%target, "drag started");
                return acquire();
            }
        }

        self.selected = None;
        PointerResponse::default()
    }

    pub fn pointer_move(&mut self, pointer: Point, scene: &OverlayScene) -> PointerResponse {
        let update = match self.state {
            GestureState::Idle => None,
            GestureState::Dragging { target, offset } => scene.element(target).map(|element| {
                let p = scene.surface.to_percent(pointer);
                let wanted = TextPosition::new(p.x - offset.dx, p.y - offset.dy);
                let (half_w, half_h) = scene.surface.half_extent_percent(&element.bounds);
                StyleUpdate {
                    target,
                    style: TextStyle {
                        position: clamp_position(wanted, half_w, half_h, self.bounds),
                        ..element.style
                    },
                }
            }),
            GestureState::Resizing {
                target, initial, ..
            } => scene.element(target).map(|element| StyleUpdate {
                target,
                style: TextStyle {
                    font_size: resized_font_size(&initial, pointer),
                    ..element.style
                },
            }),
        };
        PointerResponse {
            update,
            ..Default::default()
        }
    }

    /// Pointer up, cancel or leave: ends the active gesture.
    pub fn pointer_up(&mut self) -> PointerResponse {
        let Some(target) = self.state.target() else {
            return PointerResponse::default();
        };
        self.state = GestureState::Idle;
        trace!(%target, "gesture ended");
        PointerResponse {
            update: None,
            capture: Some(PointerCapture::Release),
            ended: Some(target),
        }
    }

    /// Re-clamp an element's position against its current measured size.
    /// Returns an update only when the stored position moves.
    pub fn reclamp(&self, target: TextTarget, scene: &OverlayScene) -> Option<StyleUpdate> {
        let element = scene.element(target)?;
        let (half_w, half_h) = scene.surface.half_extent_percent(&element.bounds);
        let position = clamp_position(element.style.position, half_w, half_h, self.bounds);
        (position != element.style.position).then_some(StyleUpdate {
            target,
            style: TextStyle {
                position,
                ..element.style
            },
        })
    }
}

fn acquire() -> PointerResponse {
    PointerResponse {
        capture: Some(PointerCapture::Acquire),
        ..Default::default()
    }
}

/// Font size for the pointer at `pointer`, always relative to the snapshot.
pub fn resized_font_size(initial: &ResizeSnapshot, pointer: Point) -> f64 {
    let reference = initial.handle_position.distance(initial.text_position);
    let scale = if reference > 0.0 {
        pointer.distance(initial.text_position) / reference
    } else {
        1.0
    };
    (initial.font_size * scale.powf(RESIZE_EXPONENT)).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}
