//! # Geometry Primitives
//!
//! Plain page-space points and axis-aligned boxes. Layout itself lives
//! outside the store; these helpers only combine coordinates already
//! present on entities.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates are within `eps` of `other`.
    #[must_use]
    pub fn approx_eq(&self, other: &Point, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// An axis-aligned box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
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

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Shift the box by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Point) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Grow the box by `pad` on every side.
    #[must_use]
    pub fn padded(&self, pad: f64) -> Rect {
        Rect::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Smallest box enclosing every point. `None` for an empty slice.
#[must_use]
pub fn bbox(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Smallest box enclosing every box. `None` for an empty slice.
#[must_use]
pub fn union(boxes: &[Rect]) -> Option<Rect> {
    let corners: Vec<Point> = boxes
        .iter()
        .flat_map(|b| [b.origin(), Point::new(b.x + b.width, b.y + b.height)])
        .collect();
    bbox(&corners)
}

/// Give degenerate boxes a minimum size, centred on their original edge.
#[must_use]
pub fn expand_box(mut rect: Rect, min_width: f64, min_height: f64) -> Rect {
    if rect.width.floor() < 1.0 {
        rect.width = min_width;
        rect.x -= min_width / 2.0;
    }
    if rect.height.floor() < 1.0 {
        rect.height = min_height;
        rect.y -= min_height / 2.0;
    }
    rect
}

#[must_use]
pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}
