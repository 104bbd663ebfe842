//! Points, sizes, rectangles and the two layout orientations.
//!
//! The layout engine works in two logical axes instead of X/Y:
//!
//! - the **sibling axis**, along which siblings are placed one after another;
//! - the **level axis**, along which each tree level is pushed away from its
//!   parent.
//!
//! In [`Orientation::Horizontal`] levels flow downward (level axis = Y) and
//! siblings are spread along X. [`Orientation::Vertical`] swaps the two.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

use crate::model::ParseEnumError;

/// A position in canvas layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return this point moved by `delta`.
    #[must_use]
    pub fn translate(self, delta: Vector) -> Self {
        Self::new(self.x + delta.dx, self.y + delta.dy)
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, rhs: Self) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Vector> for Point {
    type Output = Self;

    fn add(self, rhs: Vector) -> Self {
        self.translate(rhs)
    }
}

/// A displacement between two points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

impl Neg for Vector {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.dx, -self.dy)
    }
}

/// Width and height in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are strictly positive and finite.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(origin: Point, size: Size) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    /// Smallest rectangle covering both points.
    #[must_use]
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Direction in which the hierarchy grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Levels stack downward, siblings spread left to right.
    #[default]
    Horizontal,
    /// Levels stack rightward, siblings spread top to bottom.
    Vertical,
}

impl Orientation {
    pub const ALL: [Self; 2] = [Self::Horizontal, Self::Vertical];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    /// Split a point into `(sibling, level)` coordinates.
    #[must_use]
    pub const fn split_point(self, p: Point) -> (f64, f64) {
        match self {
            Self::Horizontal => (p.x, p.y),
            Self::Vertical => (p.y, p.x),
        }
    }

    /// Build a point from `(sibling, level)` coordinates.
    #[must_use]
    pub const fn point(self, sibling: f64, level: f64) -> Point {
        match self {
            Self::Horizontal => Point::new(sibling, level),
            Self::Vertical => Point::new(level, sibling),
        }
    }

    /// Split a size into `(sibling, level)` extents.
    #[must_use]
    pub const fn split_size(self, s: Size) -> (f64, f64) {
        match self {
            Self::Horizontal => (s.width, s.height),
            Self::Vertical => (s.height, s.width),
        }
    }

    /// Build a size from `(sibling, level)` extents.
    #[must_use]
    pub const fn size(self, sibling: f64, level: f64) -> Size {
        match self {
            Self::Horizontal => Size::new(sibling, level),
            Self::Vertical => Size::new(level, sibling),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" | "h" => Ok(Self::Horizontal),
            "vertical" | "v" => Ok(Self::Vertical),
            _ => Err(ParseEnumError {
                expected: "orientation",
                got: s.to_string(),
            }),
        }
    }
}
