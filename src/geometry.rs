//! Structures used to map areas on the screen

use serde::{Deserialize, Serialize};
use std::{
    cmp,
    fmt,
    ops::{Add, Sub},
};
use x11rb::protocol::xproto::ConfigureWindowAux;

// =============================== Point ==============================
// ====================================================================

/// A position on the screen. When this is used with a [`Rectangle`], it
/// represents the top-left corner
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub(crate) struct Point {
    /// X-coordinate
    pub(crate) x: i32,
    /// Y-coordinate
    pub(crate) y: i32,
}

impl Point {
    /// Create a new [`Point`]
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Return the `x` and `y` coordinates as a tuple
    pub(crate) const fn as_tuple(self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Check if [`Point`] is contained within the given [`Rectangle`]
    pub(crate) const fn is_inside(self, rect: Rectangle) -> bool {
        rect.is_inside(self)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

impl Add<Self> for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

// ============================= Dimension ============================
// ====================================================================

/// The width and height of an area. Both are signed because the layout
/// arithmetic may pass through negative values before being clamped
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub(crate) struct Dimension {
    /// Width of the area
    pub(crate) width:  i32,
    /// Height of the area
    pub(crate) height: i32,
}

impl Dimension {
    /// Create a new [`Dimension`]
    pub(crate) const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Return the `width` and `height` as a tuple
    pub(crate) const fn as_tuple(self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Check if either side is zero
    pub(crate) const fn is_zero(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ============================= Rectangle ============================
// ====================================================================

/// Equivalent to `xcb_rectangle_t`, with signed sides
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub(crate) struct Rectangle {
    /// X-coordinate of the top-left corner
    pub(crate) x:      i32,
    /// Y-coordinate of the top-left corner
    pub(crate) y:      i32,
    /// Width of the rectangle
    pub(crate) width:  i32,
    /// Height of the rectangle
    pub(crate) height: i32,
}

impl Rectangle {
    /// Create a new [`Rectangle`]
    pub(crate) const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a zeroed [`Rectangle`]
    pub(crate) fn zeroed() -> Self {
        Self::default()
    }

    /// The top-left corner
    pub(crate) const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The size of the [`Rectangle`]
    pub(crate) const fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    /// The x-coordinate just past the right edge
    pub(crate) const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// The y-coordinate just past the bottom edge
    pub(crate) const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Test whether the given [`Point`] is contained within the [`Rectangle`]
    pub(crate) const fn is_inside(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    /// Area of the overlap between two [`Rectangle`]s (zero when disjoint)
    pub(crate) fn intersection_area(&self, other: &Self) -> i32 {
        let width = cmp::max(
            0,
            cmp::min(self.right(), other.right()) - cmp::max(self.x, other.x),
        );
        let height = cmp::max(
            0,
            cmp::min(self.bottom(), other.bottom()) - cmp::max(self.y, other.y),
        );

        width * height
    }

    /// Shrink the [`Rectangle`] by `amount` on every side
    pub(crate) const fn inset(self, amount: i32) -> Self {
        Self {
            x:      self.x + amount,
            y:      self.y + amount,
            width:  self.width - 2 * amount,
            height: self.height - 2 * amount,
        }
    }

    /// Create a [`ConfigureWindowAux`] from a [`Rectangle`]. The X-server
    /// rejects zero sized windows, so each side is at least 1
    pub(crate) fn to_aux(self, border_width: i32) -> ConfigureWindowAux {
        ConfigureWindowAux::new()
            .x(self.x)
            .y(self.y)
            .width(cmp::max(self.width, 1) as u32)
            .height(cmp::max(self.height, 1) as u32)
            .border_width(cmp::max(border_width, 0) as u32)
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}), ({})", self.point(), self.dimension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_rectangles_is_empty() {
        let left = Rectangle::new(0, 0, 100, 100);
        let right = Rectangle::new(100, 0, 100, 100);
        assert_eq!(left.intersection_area(&right), 0);
    }

    #[test]
    fn intersection_of_overlapping_rectangles() {
        let a = Rectangle::new(0, 0, 100, 100);
        let b = Rectangle::new(50, 50, 100, 100);
        assert_eq!(a.intersection_area(&b), 2500);
        assert_eq!(b.intersection_area(&a), 2500);
    }

    #[test]
    fn inset_shrinks_every_side() {
        let rect = Rectangle::new(0, 0, 100, 50).inset(10);
        assert_eq!(rect, Rectangle::new(10, 10, 80, 30));
    }

    #[test]
    fn point_inside_excludes_far_edges() {
        let rect = Rectangle::new(0, 0, 10, 10);
        assert!(Point::new(0, 0).is_inside(rect));
        assert!(Point::new(9, 9).is_inside(rect));
        assert!(!Point::new(10, 5).is_inside(rect));
    }
}
