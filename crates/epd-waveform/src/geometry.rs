//! Update-area geometry
//!
//! Rectangles are given in panel coordinates and may hang over any panel
//! edge; the pipeline clamps them to the visible area. Crop rectangles use
//! the same absolute coordinates as the area they restrict.

/// Rectangular region, in pixels.
///
/// `x`/`y` are signed so an update area may start off-panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Horizontal position of the left edge.
    pub x: i32,
    /// Vertical position of the top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// A rectangle at `(x, y)` of `width × height` pixels.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle covering a whole `width × height` panel.
    pub const fn full(width: u32, height: u32) -> Self {
        Rect::new(0, 0, width, height)
    }

    /// True when the rectangle covers no pixels.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive bottom edge.
    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// True when panel row `row` intersects this rectangle.
    pub fn contains_row(&self, row: i32) -> bool {
        row >= self.y && row < self.bottom()
    }
}
