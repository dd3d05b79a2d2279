use crate::error::{PinError, Result};
use serde::{Deserialize, Serialize};

/// Coordinate given to used points that land exactly on the origin, which
/// would otherwise read as unused.
pub const XJITTER: f64 = 0.1;

/// Reflect an x coordinate about the vertical centre line of an image
/// `image_width` pixels wide.
pub fn mirror_x(x: f64, image_width: u32) -> f64 {
    f64::from(image_width) - 1.0 - x
}

/// Mean of a point set; the origin for an empty set.
pub fn mean_point(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::UNUSED;
    }
    let sum = points.iter().fold(Point::UNUSED, |acc, p| acc + *p);
    sum * (1.0 / points.len() as f64)
}

/// Flatten to `[x0, y0, x1, y1, ...]`.
pub fn flatten(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// A 2D landmark position in image coordinates (x right, y down).
///
/// The origin doubles as the "not supplied" sentinel: a point at exactly
/// `(0, 0)` is treated as unused everywhere in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const UNUSED: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_used(&self) -> bool {
        self.x != 0.0 || self.y != 0.0
    }

    /// Nudge a point off the origin so it keeps reading as used.
    pub fn keep_used(self) -> Point {
        if self.is_used() {
            self
        } else {
            Point::new(XJITTER, XJITTER)
        }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// An ordered set of landmarks; row index is the landmark id within its scheme.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub points: Vec<Point>,
}

impl Shape {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// A shape of `n` points, all unused.
    pub fn unused(n: usize) -> Self {
        Self {
            points: vec![Point::UNUSED; n],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_used(&self, i: usize) -> bool {
        self.points.get(i).is_some_and(Point::is_used)
    }

    pub fn used_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_used()).count()
    }

    /// Indices of the points that are set.
    pub fn used_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_used())
            .map(|(i, _)| i)
    }

    pub fn ensure_len(&self, expected: usize) -> Result<()> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(PinError::PointCountMismatch {
                expected,
                actual: self.len(),
            })
        }
    }

}

impl From<Vec<(f64, f64)>> for Shape {
    fn from(v: Vec<(f64, f64)>) -> Self {
        Shape::new(v.into_iter().map(Point::from).collect())
    }
}

impl std::ops::Index<usize> for Shape {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

impl std::ops::IndexMut<usize> for Shape {
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.points[idx]
    }
}
