//! Read-only description of what to paint for one frame.

use hookcut_models::TextTarget;

use crate::geometry::{handle_rects, selection_rect, Handle, Rect, HANDLE_SIZE};
use crate::layout::{Font, TextLayout};

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub rect: Rect,
    /// The word currently spoken.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    /// Left edge of the line, px.
    pub x: f64,
    pub baseline_y: f64,
    pub width: f64,
    pub words: Vec<PlacedWord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub target: TextTarget,
    pub font: Font,
    pub bounds: Rect,
    pub lines: Vec<PlacedLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOverlay {
    pub target: TextTarget,
    pub rect: Rect,
    pub handles: [(Handle, Rect); 4],
}

impl SelectionOverlay {
    pub fn around(target: TextTarget, bounds: &Rect) -> Self {
        Self {
            target,
            rect: selection_rect(bounds),
            handles: handle_rects(bounds, HANDLE_SIZE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameLayout {
    pub hook: Option<TextBlock>,
    pub captions: Option<TextBlock>,
    pub selection: Option<SelectionOverlay>,
}

/// Place a measured layout inside `bounds`, lines centred horizontally.
/// `active` is the index, within the laid-out words, of the spoken word.
pub fn place_block(
    target: TextTarget,
    layout: &TextLayout,
    bounds: Rect,
    active: Option<usize>,
) -> TextBlock {
    let center_x = bounds.center().x;
    let lines = layout
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let top = bounds.y + i as f64 * layout.line_height;
            let x = center_x - line.width / 2.0;
            PlacedLine {
                text: line.text.clone(),
                x,
                baseline_y: top + layout.baseline_offset,
                width: line.width,
                words: line
                    .words
                    .iter()
                    .map(|w| PlacedWord {
                        text: w.text.clone(),
                        rect: Rect::new(x + w.offset, top, w.width, layout.line_height),
                        active: Some(w.index) == active,
                    })
                    .collect(),
            }
        })
        .collect();

    TextBlock {
        target,
        font: layout.font,
        bounds,
        lines,
    }
}
