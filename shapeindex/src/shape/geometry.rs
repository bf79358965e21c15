use crate::bounding_box::BoundingBox;

use super::shape_type::{Dimension, ShapeKind, ShapeType};

/// Measure written for coordinates that carry no measure.
pub const NO_DATA: f64 = -1e40;

/// Measures below this value are read back as "no data".
pub const NO_DATA_THRESHOLD: f64 = -1e38;

/// A single vertex. `z` is meaningful only for Z shapes, `m` only for
/// M and Z shapes; constructors on [`Shape`] clear whatever the shape's
/// dimension does not carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub m: Option<f64>,
}

impl Coordinate {
    pub fn xy(x: f64, y: f64) -> Coordinate {
        Coordinate { x, y, z: 0.0, m: None }
    }

    pub fn xym(x: f64, y: f64, m: f64) -> Coordinate {
        Coordinate {
            x,
            y,
            z: 0.0,
            m: Some(m),
        }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Coordinate {
        Coordinate { x, y, z, m: None }
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Coordinate {
        Coordinate {
            x,
            y,
            z,
            m: Some(m),
        }
    }

    pub(crate) fn normalized(self, dimension: Dimension) -> Coordinate {
        let m = match self.m {
            Some(m) if dimension.has_m() && m >= NO_DATA_THRESHOLD => Some(m),
            _ => None,
        };
        Coordinate {
            x: self.x,
            y: self.y,
            z: if dimension.has_z() { self.z } else { 0.0 },
            m,
        }
    }
}

/// Extent of a shape over every ordinate it carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeExtent {
    pub bbox: BoundingBox,
    pub z_range: (f64, f64),
    /// `None` when no coordinate carries a measure.
    pub m_range: Option<(f64, f64)>,
}

/// A decoded shape record.
///
/// Multi-part shapes keep their parts as separate vertex lists; the flat
/// part-offset layout only exists on disk.
///
/// Build shapes through [`Shape::point`], [`Shape::multi_point`],
/// [`Shape::polyline`] and [`Shape::polygon`]. A shape assembled from the
/// variants directly may hold ordinates its dimension does not store, or a
/// measure below [`NO_DATA_THRESHOLD`]; it decodes to
/// [`Shape::normalized`] rather than to itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Null,
    Point {
        dimension: Dimension,
        coord: Coordinate,
    },
    MultiPoint {
        dimension: Dimension,
        points: Vec<Coordinate>,
    },
    PolyLine {
        dimension: Dimension,
        parts: Vec<Vec<Coordinate>>,
    },
    Polygon {
        dimension: Dimension,
        rings: Vec<Vec<Coordinate>>,
    },
}

impl Shape {
    pub fn null() -> Shape {
        Shape::Null
    }

    pub fn point(dimension: Dimension, coord: Coordinate) -> Shape {
        Shape::Point {
            dimension,
            coord: coord.normalized(dimension),
        }
    }

    pub fn multi_point(dimension: Dimension, points: Vec<Coordinate>) -> Shape {
        Shape::MultiPoint {
            dimension,
            points: normalize_all(points, dimension),
        }
    }

    pub fn polyline(dimension: Dimension, parts: Vec<Vec<Coordinate>>) -> Shape {
        Shape::PolyLine {
            dimension,
            parts: parts
                .into_iter()
                .map(|part| normalize_all(part, dimension))
                .collect(),
        }
    }

    pub fn polygon(dimension: Dimension, rings: Vec<Vec<Coordinate>>) -> Shape {
        Shape::Polygon {
            dimension,
            rings: rings
                .into_iter()
                .map(|ring| normalize_all(ring, dimension))
                .collect(),
        }
    }

    /// The shape as the constructors would have built it: ordinates the
    /// dimension does not carry are cleared and "no data" measures become
    /// `None`. This is the value a written record decodes to.
    pub fn normalized(self) -> Shape {
        match self {
            Shape::Null => Shape::Null,
            Shape::Point { dimension, coord } => Shape::point(dimension, coord),
            Shape::MultiPoint { dimension, points } => Shape::multi_point(dimension, points),
            Shape::PolyLine { dimension, parts } => Shape::polyline(dimension, parts),
            Shape::Polygon { dimension, rings } => Shape::polygon(dimension, rings),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Null => ShapeKind::Null,
            Shape::Point { .. } => ShapeKind::Point,
            Shape::MultiPoint { .. } => ShapeKind::MultiPoint,
            Shape::PolyLine { .. } => ShapeKind::PolyLine,
            Shape::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Shape::Null => Dimension::Xy,
            Shape::Point { dimension, .. }
            | Shape::MultiPoint { dimension, .. }
            | Shape::PolyLine { dimension, .. }
            | Shape::Polygon { dimension, .. } => *dimension,
        }
    }

    pub fn shape_type(&self) -> ShapeType {
        ShapeType::of(self.kind(), self.dimension())
    }

    /// Parts of a multi-part shape; empty for every other kind.
    pub fn parts(&self) -> &[Vec<Coordinate>] {
        match self {
            Shape::PolyLine { parts, .. } => parts,
            Shape::Polygon { rings, .. } => rings,
            _ => &[],
        }
    }

    pub fn num_parts(&self) -> usize {
        self.parts().len()
    }

    pub fn num_points(&self) -> usize {
        match self {
            Shape::Null => 0,
            Shape::Point { .. } => 1,
            Shape::MultiPoint { points, .. } => points.len(),
            Shape::PolyLine { parts, .. } => parts.iter().map(Vec::len).sum(),
            Shape::Polygon { rings, .. } => rings.iter().map(Vec::len).sum(),
        }
    }

    /// A shape without vertices is written as a null record.
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// All vertices in storage order.
    pub fn coordinates(&self) -> Box<dyn Iterator<Item = &Coordinate> + '_> {
        match self {
            Shape::Null => Box::new(std::iter::empty()),
            Shape::Point { coord, .. } => Box::new(std::iter::once(coord)),
            Shape::MultiPoint { points, .. } => Box::new(points.iter()),
            Shape::PolyLine { parts, .. } => Box::new(parts.iter().flatten()),
            Shape::Polygon { rings, .. } => Box::new(rings.iter().flatten()),
        }
    }

    /// Minimal 2D box around the shape, `None` for null or empty shapes.
    pub fn envelope(&self) -> Option<BoundingBox> {
        self.extent().map(|extent| extent.bbox)
    }

    pub fn extent(&self) -> Option<ShapeExtent> {
        let mut coords = self.coordinates();
        let first = coords.next()?;

        let mut bbox = BoundingBox::from_point(first.x, first.y);
        let mut z_range = (first.z, first.z);
        let mut m_range = first.m.map(|m| (m, m));

        for c in coords {
            bbox.expand(&BoundingBox::from_point(c.x, c.y));
            z_range = (z_range.0.min(c.z), z_range.1.max(c.z));
            if let Some(m) = c.m {
                m_range = Some(match m_range {
                    Some((lo, hi)) => (lo.min(m), hi.max(m)),
                    None => (m, m),
                });
            }
        }

        Some(ShapeExtent {
            bbox,
            z_range,
            m_range,
        })
    }
}

fn normalize_all(coords: Vec<Coordinate>, dimension: Dimension) -> Vec<Coordinate> {
    coords
        .into_iter()
        .map(|c| c.normalized(dimension))
        .collect()
}
