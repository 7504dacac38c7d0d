//! Text layout shared by drawing and hit-testing.
//!
//! Every width comes from a [`TextMeasurer`] backed by the rendering surface,
//! so the rectangles used for selection and dragging are exactly the ones
//! painted on screen.

use hookcut_models::{CaptionStyle, TextPosition, TextStyle, TranscriptWord};

use crate::geometry::{Point, Rect};

/// Surface height at which a style's font size is used unscaled.
pub const REFERENCE_HEIGHT: f64 = 600.0;
pub const MIN_SCALE: f64 = 0.4;
pub const MAX_SCALE: f64 = 2.5;
/// Lines wrap at this fraction of the surface width.
pub const WRAP_WIDTH_RATIO: f64 = 0.9;
pub const LINE_HEIGHT_RATIO: f64 = 1.2;
pub const BASELINE_RATIO: f64 = 0.8;

/// Drawing surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn scale_factor(&self) -> f64 {
        (self.height / REFERENCE_HEIGHT).clamp(MIN_SCALE, MAX_SCALE)
    }

    /// Pixel font size for a style's logical font size.
    pub fn font_px(&self, font_size: f64) -> f64 {
        (font_size * self.scale_factor()).round()
    }

    pub fn wrap_width(&self) -> f64 {
        self.width * WRAP_WIDTH_RATIO
    }

    pub fn to_absolute(&self, pos: TextPosition) -> Point {
        Point::new(pos.x / 100.0 * self.width, pos.y / 100.0 * self.height)
    }

    pub fn to_percent(&self, p: Point) -> TextPosition {
        TextPosition::new(
            percent_of(p.x, self.width),
            percent_of(p.y, self.height),
        )
    }

    /// Half the rect's extent on each axis, in percent of the surface.
    pub fn half_extent_percent(&self, rect: &Rect) -> (f64, f64) {
        (
            percent_of(rect.width / 2.0, self.width),
            percent_of(rect.height / 2.0, self.height),
        )
    }
}

fn percent_of(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        value / total * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Anton,
    Impact,
}

impl FontFamily {
    pub fn name(&self) -> &'static str {
        match self {
            FontFamily::Anton => "Anton",
            FontFamily::Impact => "Impact",
        }
    }

    /// Captions use Anton for the highlight style, Impact otherwise.
    pub fn for_captions(style: CaptionStyle) -> Self {
        match style {
            CaptionStyle::Highlight => FontFamily::Anton,
            CaptionStyle::Karaoke => FontFamily::Impact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub family: FontFamily,
    pub size_px: f64,
}

impl Font {
    /// CSS-style font shorthand, e.g. `bold 48px Impact`.
    pub fn css(&self) -> String {
        format!("bold {}px {}", self.size_px, self.family.name())
    }
}

/// Width of a run of text on the rendering surface.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &Font) -> f64;
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for &T {
    fn measure(&self, text: &str, font: &Font) -> f64 {
        (**self).measure(text, font)
    }
}

/// Measures every character as a fixed fraction of the font size.
///
/// Deterministic, for headless rendering and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAdvanceMeasurer {
    pub advance_ratio: f64,
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self { advance_ratio: 0.56 }
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn measure(&self, text: &str, font: &Font) -> f64 {
        text.chars().count() as f64 * font.size_px * self.advance_ratio
    }
}

/// A caption word placed on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutWord {
    /// Index into the word slice that was laid out.
    pub index: usize,
    pub text: String,
    /// Distance from the line's left edge, px.
    pub offset: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub text: String,
    pub width: f64,
    /// Caption words on this line; empty for hook text.
    pub words: Vec<LayoutWord>,
}

/// Measured, wrapped text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<LayoutLine>,
    pub font: Font,
    pub line_height: f64,
    pub total_height: f64,
    pub max_line_width: f64,
    pub baseline_offset: f64,
}

impl TextLayout {
    pub fn font_size_px(&self) -> f64 {
        self.font.size_px
    }

    /// Block rectangle centred on `position`.
    pub fn bounds(&self, surface: &Surface, position: TextPosition) -> Rect {
        Rect::centered(
            surface.to_absolute(position),
            self.max_line_width,
            self.total_height,
        )
    }
}

/// Computes text layouts against one surface.
#[derive(Debug, Clone)]
pub struct TextLayoutMeasurer<M> {
    measurer: M,
    surface: Surface,
}

impl<M: TextMeasurer> TextLayoutMeasurer<M> {
    pub fn new(measurer: M, surface: Surface) -> Self {
        Self { measurer, surface }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn set_surface(&mut self, surface: Surface) {
        self.surface = surface;
    }

    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    /// Layout of the hook headline. Explicit newlines are hard breaks; each
    /// segment is then wrapped greedily by words.
    pub fn hook(&self, text: &str, style: &TextStyle) -> Option<TextLayout> {
        if text.trim().is_empty() {
            return None;
        }
        let font = Font {
            family: FontFamily::Impact,
            size_px: self.surface.font_px(style.font_size),
        };

        let mut lines = Vec::new();
        for segment in text.split('\n') {
            let tokens: Vec<String> = segment.split_whitespace().map(str::to_string).collect();
            if tokens.is_empty() {
                lines.push(LayoutLine {
                    text: String::new(),
                    width: 0.0,
                    words: Vec::new(),
                });
                continue;
            }
            for group in self.wrap(&tokens, &font) {
                let text = group.join(" ");
                let width = self.measurer.measure(&text, &font);
                lines.push(LayoutLine {
                    text,
                    width,
                    words: Vec::new(),
                });
            }
        }
        Some(self.finish(lines, font))
    }

    /// Layout of a run of caption words. Words are never split; karaoke
    /// captions are measured and drawn upper-cased.
    pub fn captions(
        &self,
        words: &[TranscriptWord],
        style: &TextStyle,
        caption_style: CaptionStyle,
    ) -> Option<TextLayout> {
        let tokens: Vec<(usize, String)> = words
            .iter()
            .enumerate()
            .filter_map(|(i, w)| {
                let t = w.word.trim();
                if t.is_empty() {
                    None
                } else if caption_style.is_karaoke() {
                    Some((i, t.to_uppercase()))
                } else {
                    Some((i, t.to_string()))
                }
            })
            .collect();
        if tokens.is_empty() {
            return None;
        }
        let font = Font {
            family: FontFamily::for_captions(caption_style),
            size_px: self.surface.font_px(style.font_size),
        };

        let texts: Vec<String> = tokens.iter().map(|(_, t)| t.clone()).collect();
        let mut lines = Vec::new();
        let mut cursor = 0;
        for group in self.wrap(&texts, &font) {
            let mut line_words = Vec::with_capacity(group.len());
            let mut prefix = String::new();
            for text in &group {
                let offset = if prefix.is_empty() {
                    0.0
                } else {
                    prefix.push(' ');
                    self.measurer.measure(&prefix, &font)
                };
                let width = self.measurer.measure(text, &font);
                line_words.push(LayoutWord {
                    index: tokens[cursor].0,
                    text: text.clone(),
                    offset,
                    width,
                });
                prefix.push_str(text);
                cursor += 1;
            }
            let width = self.measurer.measure(&prefix, &font);
            lines.push(LayoutLine {
                text: prefix,
                width,
                words: line_words,
            });
        }
        Some(self.finish(lines, font))
    }

    /// Greedy packing of whole tokens into lines no wider than the wrap
    /// width. A token wider than the wrap width gets a line of its own.
    fn wrap(&self, tokens: &[String], font: &Font) -> Vec<Vec<String>> {
        let max_width = self.surface.wrap_width();
        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for token in tokens {
            if current.is_empty() {
                current.push(token.clone());
                continue;
            }
            let candidate = format!("{} {}", current.join(" "), token);
            if self.measurer.measure(&candidate, font) > max_width {
                groups.push(std::mem::take(&mut current));
            }
            current.push(token.clone());
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }

    fn finish(&self, lines: Vec<LayoutLine>, font: Font) -> TextLayout {
        let line_height = font.size_px * LINE_HEIGHT_RATIO;
        let max_line_width = lines
            .iter()
            .filter(|l| !l.text.is_empty())
            .map(|l| l.width)
            .fold(0.0, f64::max);
        TextLayout {
            total_height: lines.len() as f64 * line_height,
            lines,
            font,
            line_height,
            max_line_width,
            baseline_offset: font.size_px * BASELINE_RATIO,
        }
    }
}
