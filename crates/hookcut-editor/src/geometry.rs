//! Frame geometry: points, rectangles, corner handles and position clamping.
//!
//! Pointer coordinates and measured text are in surface pixels; stored
//! positions are percentages of the frame. Conversions go through
//! [`Surface`](crate::layout::Surface).

use hookcut_models::TextPosition;

/// Side length of a drawn resize handle, px.
pub const HANDLE_SIZE: f64 = 10.0;
/// Side length of the clickable zone around a handle, px.
pub const HANDLE_HIT_SIZE: f64 = 20.0;
/// Padding between the text block and its selection rectangle, px.
pub const SELECTION_PADDING: f64 = 6.0;

/// Default clamp range for positions, percent.
pub const POSITION_MIN: f64 = 5.0;
pub const POSITION_MAX: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Edges inclusive.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn inflate(&self, by: f64) -> Self {
        Self::new(
            self.x - by,
            self.y - by,
            self.width + 2.0 * by,
            self.height + 2.0 * by,
        )
    }
}

/// Corner resize handles of a selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    /// Corner of `rect` this handle sits on.
    pub fn corner(&self, rect: &Rect) -> Point {
        match self {
            Handle::TopLeft => Point::new(rect.x, rect.y),
            Handle::TopRight => Point::new(rect.right(), rect.y),
            Handle::BottomLeft => Point::new(rect.x, rect.bottom()),
            Handle::BottomRight => Point::new(rect.right(), rect.bottom()),
        }
    }
}

/// Selection rectangle drawn around a measured text block.
pub fn selection_rect(bounds: &Rect) -> Rect {
    bounds.inflate(SELECTION_PADDING)
}

/// Squares of side `size` centred on each corner of the selection rectangle.
pub fn handle_rects(bounds: &Rect, size: f64) -> [(Handle, Rect); 4] {
    let selection = selection_rect(bounds);
    Handle::ALL.map(|h| (h, Rect::centered(h.corner(&selection), size, size)))
}

/// Handle under `p`, if any.
pub fn hit_handle(bounds: &Rect, p: Point) -> Option<Handle> {
    handle_rects(bounds, HANDLE_HIT_SIZE)
        .into_iter()
        .find(|(_, r)| r.contains(p))
        .map(|(h, _)| h)
}

/// Inclusive range a centre coordinate may take, percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ClampBounds {
    fn default() -> Self {
        Self {
            min: POSITION_MIN,
            max: POSITION_MAX,
        }
    }
}

impl ClampBounds {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Clamp one axis so an element of half-extent `half` stays inside the
    /// range. Pins to the midpoint when the element is wider than the travel.
    pub fn clamp_axis(&self, value: f64, half: f64) -> f64 {
        let half = if half.is_finite() { half.max(0.0) } else { 0.0 };
        let lo = self.min + half;
        let hi = self.max - half;
        if lo > hi {
            self.midpoint()
        } else {
            value.clamp(lo, hi)
        }
    }
}

/// Clamp a centre position so the element's edges stay inside `bounds` on
/// both axes independently. `half_w`/`half_h` are percent of frame size.
pub fn clamp_position(
    pos: TextPosition,
    half_w: f64,
    half_h: f64,
    bounds: ClampBounds,
) -> TextPosition {
    TextPosition::new(
        bounds.clamp_axis(pos.x, half_w),
        bounds.clamp_axis(pos.y, half_h),
    )
}
