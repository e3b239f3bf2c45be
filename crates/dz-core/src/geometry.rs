//! Plain geometry value types shared by every stage of the engine.
//!
//! Pixel sizes and viewport-normalized coordinates both use `f64`. Which
//! space a value lives in is a property of where it came from, not of the
//! type.

use serde::{Deserialize, Serialize};

use crate::InvalidImageSizeError;

/// A point in pixel or viewport-normalized space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn delta(self, other: Self) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }
}

/// A two-component size, `x` being the horizontal extent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Size {
    pub x: f64,
    pub y: f64,
}

impl Size {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Aspect ratio as height over width ("tallness").
    #[must_use]
    pub fn ratio(self) -> f64 {
        self.y / self.x
    }

    #[must_use]
    pub const fn swapped(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }

    /// True when both components are finite and strictly positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.x > 0.0 && self.y > 0.0
    }
}

/// Pixel dimensions of a full-resolution image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Validated constructor; both dimensions must be non-zero.
    pub fn checked(width: u32, height: u32) -> Result<Self, InvalidImageSizeError> {
        if width == 0 || height == 0 {
            return Err(InvalidImageSizeError {
                width: f64::from(width),
                height: f64::from(height),
            });
        }
        Ok(Self { width, height })
    }

    /// Height over width.
    #[must_use]
    pub fn aspect_ratio(self) -> f64 {
        f64::from(self.height) / f64::from(self.width)
    }

    #[must_use]
    pub fn as_size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle spanning two arbitrary corner points.
    #[must_use]
    pub fn from_points(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    #[must_use]
    pub fn right(self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub const fn top_left(self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn top_right(self) -> Point {
        Point::new(self.right(), self.y)
    }

    #[must_use]
    pub fn bottom_left(self) -> Point {
        Point::new(self.x, self.bottom())
    }

    #[must_use]
    pub fn bottom_right(self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    #[must_use]
    pub fn center(self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// True when the two rectangles share any area or touch.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Grow the rectangle by `margin` on every side.
    #[must_use]
    pub fn expand(self, margin: f64) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageSize, Point, Rect, Size};

    #[test]
    fn rect_from_points_is_normalized() {
        let rect = Rect::from_points(Point::new(0.6, 0.8), Point::new(0.2, 0.3));
        assert_eq!(rect.top_left(), Point::new(0.2, 0.3));
        assert!((rect.width - 0.4).abs() < 1e-12);
        assert!((rect.height - 0.5).abs() < 1e-12);
    }

    #[test]
    fn size_ratio_is_height_over_width() {
        assert_eq!(Size::new(200.0, 100.0).ratio(), 0.5);
        assert_eq!(Size::new(200.0, 100.0).swapped(), Size::new(100.0, 200.0));
    }

    #[test]
    fn image_size_rejects_zero_dimensions() {
        assert!(ImageSize::checked(0, 10).is_err());
        assert!(ImageSize::checked(10, 0).is_err());
        assert_eq!(ImageSize::checked(10, 20).map(ImageSize::aspect_ratio), Ok(2.0));
    }

    #[test]
    fn intersection_includes_touching_edges() {
        let a = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(a.intersects(Rect::new(1.0, 0.5, 1.0, 1.0)));
        assert!(!a.intersects(Rect::new(1.5, 0.5, 1.0, 1.0)));
    }

    #[test]
    fn expand_grows_every_side() {
        let rect = Rect::new(1.0, 1.0, 2.0, 2.0).expand(0.5);
        assert_eq!(rect, Rect::new(0.5, 0.5, 3.0, 3.0));
    }
}
