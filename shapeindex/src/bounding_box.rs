use serde::{Deserialize, Serialize};

use crate::errors::{SpatialError, SpatialResult};

/// A 2D axis-aligned bounding box represented by minimum and maximum coordinates.
///
/// `BoundingBox` is the key of every R-Tree entry and the shape of every
/// query. Edges are inclusive: two boxes that only touch do intersect.
///
/// # Examples
///
/// ```rust
/// use shapeindex::BoundingBox;
///
/// let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
/// assert!(bbox.contains_point(50.0, 50.0));
/// assert!(bbox.validate().is_ok());
/// ```
#[derive(Clone, Copy, PartialEq, Default, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BoundingBox({}, {}, {}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

impl BoundingBox {
    /// Creates a new bounding box with the specified coordinates.
    ///
    /// No validation happens here; boxes entering the index are checked
    /// with [`BoundingBox::validate`].
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a zero-area box located at a single point.
    pub fn from_point(x: f64, y: f64) -> BoundingBox {
        BoundingBox::new(x, y, x, y)
    }

    /// The identity for [`BoundingBox::expand`]: inverted and infinite.
    pub(crate) fn empty() -> BoundingBox {
        BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Rejects boxes that cannot be stored in or used to query the index:
    /// any NaN or infinite ordinate, or a minimum greater than its maximum.
    pub fn validate(&self) -> SpatialResult<()> {
        let ordinates = [self.min_x, self.min_y, self.max_x, self.max_y];
        if ordinates.iter().any(|v| v.is_nan()) {
            return Err(SpatialError::Validation(format!(
                "{} contains NaN ordinates",
                self
            )));
        }
        if ordinates.iter().any(|v| v.is_infinite()) {
            return Err(SpatialError::Validation(format!(
                "{} contains infinite ordinates",
                self
            )));
        }
        if !self.is_valid() {
            return Err(SpatialError::Validation(format!("{} is inverted", self)));
        }
        Ok(())
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns the area of the bounding box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }

    /// Checks if this bounding box contains a point.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Checks if this bounding box contains another bounding box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Checks if this bounding box intersects another bounding box.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Returns the union of this bounding box with another.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grows this box in place to cover `other`.
    pub fn expand(&mut self, other: &BoundingBox) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Area that must be added to this box so that it also covers `other`.
    pub fn enlargement(&self, other: &BoundingBox) -> f64 {
        self.union(other).area() - self.area()
    }

    /// Checks if this bounding box is valid (min <= max).
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// Checks if this bounding box is a point (zero area).
    pub fn is_point(&self) -> bool {
        self.min_x == self.max_x && self.min_y == self.max_y
    }
}
