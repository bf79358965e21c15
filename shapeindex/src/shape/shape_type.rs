use std::fmt::{Display, Formatter};

use crate::errors::{SpatialError, SpatialResult};

/// Ordinates carried by a shape beyond X and Y.
///
/// Determined by the shape type code alone, never by the coordinate values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// X and Y only
    Xy,
    /// X, Y and a measure
    Xym,
    /// X, Y, Z and a measure
    Xyzm,
}

impl Dimension {
    pub fn has_z(self) -> bool {
        matches!(self, Dimension::Xyzm)
    }

    pub fn has_m(self) -> bool {
        !matches!(self, Dimension::Xy)
    }
}

/// Geometry family of a shape type, independent of its dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Null,
    Point,
    MultiPoint,
    PolyLine,
    Polygon,
}

/// Shape type codes of the shapefile format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
}

impl ShapeType {
    /// Decodes a shape type code. Codes outside the supported set
    /// (including MultiPatch, 31) are a format error.
    pub fn from_code(code: i32) -> SpatialResult<ShapeType> {
        let shape_type = match code {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            other => {
                return Err(SpatialError::Format(format!(
                    "unsupported shape type code {}",
                    other
                )))
            }
        };
        Ok(shape_type)
    }

    pub fn code(self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::PointZ => 11,
            ShapeType::PolyLineZ => 13,
            ShapeType::PolygonZ => 15,
            ShapeType::MultiPointZ => 18,
            ShapeType::PointM => 21,
            ShapeType::PolyLineM => 23,
            ShapeType::PolygonM => 25,
            ShapeType::MultiPointM => 28,
        }
    }

    /// Combines a geometry family and a dimension into a type code.
    pub fn of(kind: ShapeKind, dimension: Dimension) -> ShapeType {
        match (kind, dimension) {
            (ShapeKind::Null, _) => ShapeType::Null,
            (ShapeKind::Point, Dimension::Xy) => ShapeType::Point,
            (ShapeKind::Point, Dimension::Xym) => ShapeType::PointM,
            (ShapeKind::Point, Dimension::Xyzm) => ShapeType::PointZ,
            (ShapeKind::MultiPoint, Dimension::Xy) => ShapeType::MultiPoint,
            (ShapeKind::MultiPoint, Dimension::Xym) => ShapeType::MultiPointM,
            (ShapeKind::MultiPoint, Dimension::Xyzm) => ShapeType::MultiPointZ,
            (ShapeKind::PolyLine, Dimension::Xy) => ShapeType::PolyLine,
            (ShapeKind::PolyLine, Dimension::Xym) => ShapeType::PolyLineM,
            (ShapeKind::PolyLine, Dimension::Xyzm) => ShapeType::PolyLineZ,
            (ShapeKind::Polygon, Dimension::Xy) => ShapeType::Polygon,
            (ShapeKind::Polygon, Dimension::Xym) => ShapeType::PolygonM,
            (ShapeKind::Polygon, Dimension::Xyzm) => ShapeType::PolygonZ,
        }
    }

    pub fn kind(self) -> ShapeKind {
        match self {
            ShapeType::Null => ShapeKind::Null,
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => ShapeKind::Point,
            ShapeType::MultiPoint | ShapeType::MultiPointZ | ShapeType::MultiPointM => {
                ShapeKind::MultiPoint
            }
            ShapeType::PolyLine | ShapeType::PolyLineZ | ShapeType::PolyLineM => {
                ShapeKind::PolyLine
            }
            ShapeType::Polygon | ShapeType::PolygonZ | ShapeType::PolygonM => ShapeKind::Polygon,
        }
    }

    pub fn dimension(self) -> Dimension {
        match self {
            ShapeType::PointZ
            | ShapeType::PolyLineZ
            | ShapeType::PolygonZ
            | ShapeType::MultiPointZ => Dimension::Xyzm,
            ShapeType::PointM
            | ShapeType::PolyLineM
            | ShapeType::PolygonM
            | ShapeType::MultiPointM => Dimension::Xym,
            _ => Dimension::Xy,
        }
    }

    pub fn is_null(self) -> bool {
        self == ShapeType::Null
    }
}

impl Display for ShapeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ShapeType; 13] = [
        ShapeType::Null,
        ShapeType::Point,
        ShapeType::PolyLine,
        ShapeType::Polygon,
        ShapeType::MultiPoint,
        ShapeType::PointZ,
        ShapeType::PolyLineZ,
        ShapeType::PolygonZ,
        ShapeType::MultiPointZ,
        ShapeType::PointM,
        ShapeType::PolyLineM,
        ShapeType::PolygonM,
        ShapeType::MultiPointM,
    ];

    #[test]
    fn test_codes_are_stable() {
        for shape_type in ALL {
            assert_eq!(ShapeType::from_code(shape_type.code()).unwrap(), shape_type);
        }
        assert_eq!(ShapeType::PolygonZ.code(), 15);
        assert_eq!(ShapeType::MultiPointM.code(), 28);
    }

    #[test]
    fn test_unknown_code_is_format_error() {
        let err = ShapeType::from_code(31).unwrap_err();
        assert!(matches!(err, SpatialError::Format(_)));
        assert!(ShapeType::from_code(-1).is_err());
    }

    #[test]
    fn test_kind_and_dimension_compose() {
        for shape_type in ALL {
            assert_eq!(
                ShapeType::of(shape_type.kind(), shape_type.dimension()),
                shape_type
            );
        }
        assert!(ShapeType::PointZ.dimension().has_z());
        assert!(ShapeType::PointZ.dimension().has_m());
        assert!(!ShapeType::PolyLineM.dimension().has_z());
        assert!(!ShapeType::Polygon.dimension().has_m());
    }
}
