//! Geometry primitives shared by the shell and input subsystems
//!
//! All coordinates are logical pixels. Rectangles use a top-left origin and
//! non-negative sizes; a rectangle with zero width or height is empty.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Integer point (or displacement) in logical coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_f64(self) -> PointF {
        PointF::new(self.x as f64, self.y as f64)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point::new(x, y)
    }
}

/// Sub-pixel point used for pointer positions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Sub<Point> for PointF {
    type Output = PointF;

    fn sub(self, rhs: Point) -> PointF {
        PointF::new(self.x - rhs.x as f64, self.y - rhs.y as f64)
    }
}

impl From<(f64, f64)> for PointF {
    fn from((x, y): (f64, f64)) -> Self {
        PointF::new(x, y)
    }
}

/// Width/height pair. Zero on an axis means "unspecified" in protocol hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl From<(i32, i32)> for Size {
    fn from((width, height): (i32, i32)) -> Self {
        Size::new(width, height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub loc: Point,
    pub size: Size,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            loc: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_loc_and_size(loc: impl Into<Point>, size: impl Into<Size>) -> Self {
        Self {
            loc: loc.into(),
            size: size.into(),
        }
    }

    pub fn left(&self) -> i32 {
        self.loc.x
    }

    pub fn top(&self) -> i32 {
        self.loc.y
    }

    /// Exclusive right edge, saturating at `i32::MAX`
    pub fn right(&self) -> i32 {
        self.loc.x.saturating_add(self.size.width)
    }

    /// Exclusive bottom edge, saturating at `i32::MAX`
    pub fn bottom(&self) -> i32 {
        self.loc.y.saturating_add(self.size.height)
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn translated(&self, by: Point) -> Rectangle {
        Rectangle {
            loc: self.loc + by,
            size: self.size,
        }
    }

    pub fn contains(&self, point: PointF) -> bool {
        point.x >= self.left() as f64
            && point.x < self.right() as f64
            && point.y >= self.top() as f64
            && point.y < self.bottom() as f64
    }

    /// True if `other` lies completely inside `self`
    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn overlaps(&self, other: &Rectangle) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_edges_are_exclusive() {
        let rect = Rectangle::new(10, 20, 30, 40);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
        assert!(rect.contains(PointF::new(10.0, 20.0)));
        assert!(rect.contains(PointF::new(39.5, 59.5)));
        assert!(!rect.contains(PointF::new(40.0, 30.0)));
    }

    #[test]
    fn test_contains_rect_and_overlap() {
        let outer = Rectangle::new(0, 0, 100, 100);
        assert!(outer.contains_rect(&Rectangle::new(10, 10, 90, 90)));
        assert!(!outer.contains_rect(&Rectangle::new(10, 10, 91, 90)));
        assert!(outer.overlaps(&Rectangle::new(99, 99, 10, 10)));
        assert!(!outer.overlaps(&Rectangle::new(100, 0, 10, 10)));
    }

    #[test]
    fn test_edges_saturate() {
        let rect = Rectangle::new(i32::MAX - 10, i32::MAX, 100, 1);
        assert_eq!(rect.right(), i32::MAX);
        assert_eq!(rect.bottom(), i32::MAX);
        assert_eq!(rect.translated(Point::new(20, 0)).loc.x, i32::MAX);
    }

    #[test]
    fn test_pointf_minus_origin() {
        let local = PointF::new(110.5, 20.0) - Point::new(100, 10);
        assert_eq!(local, PointF::new(10.5, 10.0));
    }
}
