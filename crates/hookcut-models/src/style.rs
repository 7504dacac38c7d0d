//! On-screen text styles for the hook and captions overlays.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::error::{ModelError, ModelResult};

/// Smallest font size a style may carry (logical px).
pub const MIN_FONT_SIZE: f64 = 12.0;
/// Largest font size a style may carry (logical px).
pub const MAX_FONT_SIZE: f64 = 220.0;

/// The two editable overlay elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TextTarget {
    Hook,
    Captions,
}

impl TextTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextTarget::Hook => "hook",
            TextTarget::Captions => "captions",
        }
    }
}

impl fmt::Display for TextTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an element's centre, in percent of frame width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct TextPosition {
    #[validate(range(min = 0.0, max = 100.0))]
    pub x: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub y: f64,
}

impl TextPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Font size and position for one overlay element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[validate(range(min = 12.0, max = 220.0))]
    pub font_size: f64,
    #[validate(nested)]
    pub position: TextPosition,
}

impl TextStyle {
    pub const fn new(font_size: f64, x: f64, y: f64) -> Self {
        Self {
            font_size,
            position: TextPosition::new(x, y),
        }
    }

    /// Default style for the hook headline.
    pub const fn default_hook() -> Self {
        Self::new(100.0, 50.0, 22.0)
    }

    /// Default style for the captions block.
    pub const fn default_captions() -> Self {
        Self::new(100.0, 50.0, 70.0)
    }

    pub fn default_for(target: TextTarget) -> Self {
        match target {
            TextTarget::Hook => Self::default_hook(),
            TextTarget::Captions => Self::default_captions(),
        }
    }

    /// Parse a stored style override, rejecting unknown or out-of-range shapes.
    pub fn from_json(value: &serde_json::Value) -> ModelResult<Self> {
        let style: TextStyle = serde_json::from_value(value.clone())
            .map_err(|e| ModelError::invalid("style", e.to_string()))?;
        style
            .validate()
            .map_err(|e| ModelError::invalid("style", e.to_string()))?;
        Ok(style)
    }
}

/// Visual treatment for word-synchronized captions.
///
/// Serialized as its numeric id. Ids 4 and 99 are reserved for styles that
/// are not yet renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum CaptionStyle {
    /// Static block with the spoken word highlighted.
    #[default]
    Highlight,
    /// Karaoke wipe over upper-cased words.
    Karaoke,
}

impl CaptionStyle {
    pub const fn id(self) -> u8 {
        match self {
            CaptionStyle::Highlight => 1,
            CaptionStyle::Karaoke => 3,
        }
    }

    pub fn is_karaoke(self) -> bool {
        matches!(self, CaptionStyle::Karaoke)
    }
}

impl TryFrom<u8> for CaptionStyle {
    type Error = ModelError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(CaptionStyle::Highlight),
            3 => Ok(CaptionStyle::Karaoke),
            4 | 99 => Err(ModelError::CaptionStyleUnavailable(id)),
            other => Err(ModelError::UnknownCaptionStyle(other)),
        }
    }
}

impl From<CaptionStyle> for u8 {
    fn from(style: CaptionStyle) -> Self {
        style.id()
    }
}

impl JsonSchema for CaptionStyle {
    fn schema_name() -> String {
        "CaptionStyle".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        <u8 as JsonSchema>::json_schema(gen)
    }
}

impl fmt::Display for CaptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_style_wire_shape() {
        let style = TextStyle::default_hook();
        let json = serde_json::to_value(style).unwrap();
        assert_eq!(json, json!({"fontSize": 100.0, "position": {"x": 50.0, "y": 22.0}}));
    }

    #[test]
    fn test_from_json_rejects_out_of_range() {
        let too_big = json!({"fontSize": 400, "position": {"x": 50, "y": 50}});
        assert!(TextStyle::from_json(&too_big).is_err());

        let off_frame = json!({"fontSize": 40, "position": {"x": 150, "y": 50}});
        assert!(TextStyle::from_json(&off_frame).is_err());
    }

    #[test]
    fn test_from_json_rejects_unknown_shape() {
        let wrong = json!({"size": 40});
        assert!(TextStyle::from_json(&wrong).is_err());
    }

    #[test]
    fn test_from_json_accepts_integers() {
        let ok = json!({"fontSize": 64, "position": {"x": 40, "y": 80}});
        let style = TextStyle::from_json(&ok).unwrap();
        assert_eq!(style.font_size, 64.0);
        assert_eq!(style.position, TextPosition::new(40.0, 80.0));
    }

    #[test]
    fn test_caption_style_ids() {
        assert_eq!(CaptionStyle::try_from(1), Ok(CaptionStyle::Highlight));
        assert_eq!(CaptionStyle::try_from(3), Ok(CaptionStyle::Karaoke));
        assert_eq!(
            CaptionStyle::try_from(4),
            Err(ModelError::CaptionStyleUnavailable(4))
        );
        assert_eq!(
            CaptionStyle::try_from(99),
            Err(ModelError::CaptionStyleUnavailable(99))
        );
        assert_eq!(
            CaptionStyle::try_from(2),
            Err(ModelError::UnknownCaptionStyle(2))
        );
    }

    #[test]
    fn test_caption_style_serde_as_number() {
        assert_eq!(serde_json::to_value(CaptionStyle::Karaoke).unwrap(), json!(3));
        let parsed: CaptionStyle = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(parsed, CaptionStyle::Highlight);
        assert!(serde_json::from_value::<CaptionStyle>(json!(99)).is_err());
    }
}
