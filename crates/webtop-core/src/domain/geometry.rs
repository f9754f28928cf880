//! Geometry primitives in CSS pixel space.
//!
//! The desktop surface uses a single coordinate system whose origin is the
//! top-left corner of the viewport.  X grows to the right, Y grows downward.
//! Coordinates are `f64` because browsers report fractional pixel positions
//! for touch input and high-DPI pointers.

use serde::{Deserialize, Serialize};

/// A position on the desktop surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` when both coordinates are finite numbers.
    ///
    /// Input events carrying `NaN` or infinities are malformed and must be
    /// ignored rather than fed into classification or hit-testing.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Returns the displacement `(self - origin)` as `(dx, dy)`.
    pub fn delta_from(&self, origin: Point) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// Width and height of a rectangular surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle.
///
/// `origin` is the top-left corner.  The right and bottom edges are exclusive,
/// so two rectangles that merely touch do not both contain the shared edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Returns the rightmost X coordinate (exclusive).
    pub fn right(&self) -> f64 {
        self.origin.x + self.size.width
    }

    /// Returns the bottommost Y coordinate (exclusive).
    pub fn bottom(&self) -> f64 {
        self.origin.y + self.size.height
    }

    /// Returns `true` if `point` lies inside this rectangle.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x < self.right()
            && point.y >= self.origin.y
            && point.y < self.bottom()
    }

    /// Clamps the top-left corner of a `size`-sized box so that the whole box
    /// stays inside this rectangle.
    ///
    /// When the box is larger than the rectangle on an axis, the box is pinned
    /// to the rectangle's leading edge on that axis (left or top), so content
    /// never disappears above or to the left of the visible area.
    pub fn clamp_box(&self, top_left: Point, size: Size) -> Point {
        Point {
            x: clamp_axis(top_left.x, self.origin.x, self.right() - size.width),
            y: clamp_axis(top_left.y, self.origin.y, self.bottom() - size.height),
        }
    }
}

/// Like `f64::clamp`, but never panics when `max < min`; `min` wins instead.
fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    if max < min {
        return min;
    }
    value.max(min).min(max)
}
