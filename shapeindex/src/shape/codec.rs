//! Bit-exact encoding of shape record contents.
//!
//! A record content is the little-endian shape type code followed by a
//! type-specific body:
//!
//! ```text
//! Point        x y [z] [m]
//! MultiPoint   box(4) numPoints xy[n] [zRange z[n]] [mRange m[n]]
//! PolyLine     box(4) numParts numPoints parts[numParts] xy[n] [zRange z[n]] [mRange m[n]]
//! Polygon      same layout as PolyLine
//! ```
//!
//! Z and M blocks are present according to the shape type code only. Z
//! shapes are always written with their M block. [`decode`] and
//! [`read_sized`] accept a Z record content without it, as older writers
//! omit it; [`read`] knows no content length and always expects it.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::errors::{SpatialError, SpatialResult};

use super::geometry::{Coordinate, Shape, ShapeExtent, NO_DATA, NO_DATA_THRESHOLD};
use super::shape_type::{Dimension, ShapeKind, ShapeType};

const TYPE_LEN: usize = 4;
const BOX_LEN: usize = 32;
const COUNT_LEN: usize = 4;
const XY_LEN: usize = 16;
const ORDINATE_LEN: usize = 8;
const RANGE_LEN: usize = 16;

/// The record used for absent or empty geometries.
pub fn null_shape() -> Shape {
    Shape::Null
}

/// Exact number of content bytes [`write`] produces for `shape`.
pub fn length(shape: &Shape) -> usize {
    if shape.is_empty() {
        return TYPE_LEN;
    }

    let dimension = shape.dimension();
    let n = shape.num_points();
    let extra_blocks = usize::from(dimension.has_z()) + usize::from(dimension.has_m());

    match shape {
        Shape::Null => TYPE_LEN,
        Shape::Point { .. } => TYPE_LEN + XY_LEN + extra_blocks * ORDINATE_LEN,
        Shape::MultiPoint { .. } => {
            TYPE_LEN + BOX_LEN + COUNT_LEN + n * XY_LEN
                + extra_blocks * (RANGE_LEN + n * ORDINATE_LEN)
        }
        Shape::PolyLine { .. } | Shape::Polygon { .. } => {
            TYPE_LEN + BOX_LEN + 2 * COUNT_LEN
                + shape.num_parts() * COUNT_LEN
                + n * XY_LEN
                + extra_blocks * (RANGE_LEN + n * ORDINATE_LEN)
        }
    }
}

/// Encodes `shape` into `buf`. The buffer must have room for
/// [`length`] bytes; nothing is written otherwise.
pub fn write<B: BufMut>(buf: &mut B, shape: &Shape) -> SpatialResult<()> {
    let expected = length(shape);
    if buf.remaining_mut() < expected {
        return Err(SpatialError::InvalidOperation(format!(
            "buffer has room for {} bytes, record needs {}",
            buf.remaining_mut(),
            expected
        )));
    }

    let extent = match shape.extent() {
        Some(extent) => extent,
        None => {
            buf.put_i32_le(ShapeType::Null.code());
            return Ok(());
        }
    };

    let dimension = shape.dimension();
    let (num_points, num_parts, part_offsets) = counts(shape)?;
    buf.put_i32_le(shape.shape_type().code());

    match shape {
        Shape::Null => {}
        Shape::Point { coord, .. } => {
            buf.put_f64_le(coord.x);
            buf.put_f64_le(coord.y);
            if dimension.has_z() {
                buf.put_f64_le(coord.z);
            }
            if dimension.has_m() {
                buf.put_f64_le(coord.m.unwrap_or(NO_DATA));
            }
        }
        Shape::MultiPoint { points, .. } => {
            put_box(buf, &extent);
            buf.put_i32_le(num_points);
            put_ordinates(buf, dimension, &extent, points.iter());
        }
        Shape::PolyLine { parts, .. } | Shape::Polygon { rings: parts, .. } => {
            put_box(buf, &extent);
            buf.put_i32_le(num_parts);
            buf.put_i32_le(num_points);
            for offset in &part_offsets {
                buf.put_i32_le(*offset);
            }
            put_ordinates(buf, dimension, &extent, parts.iter().flatten());
        }
    }

    Ok(())
}

/// Point count and part offsets as stored on disk, checked against the
/// 32-bit count fields before anything is written.
fn counts(shape: &Shape) -> SpatialResult<(i32, i32, Vec<i32>)> {
    let num_points = count_field(shape.num_points(), "point count")?;
    let num_parts = count_field(shape.num_parts(), "part count")?;
    let mut offsets = Vec::with_capacity(shape.num_parts());
    let mut offset = 0usize;
    for part in shape.parts() {
        offsets.push(count_field(offset, "part offset")?);
        offset += part.len();
    }
    Ok((num_points, num_parts, offsets))
}

fn count_field(value: usize, what: &str) -> SpatialResult<i32> {
    i32::try_from(value).map_err(|_| {
        SpatialError::InvalidOperation(format!(
            "{} {} does not fit a record count field",
            what, value
        ))
    })
}

/// Encodes `shape` into a freshly allocated buffer of exactly [`length`] bytes.
pub fn encode(shape: &Shape) -> SpatialResult<Bytes> {
    let mut buf = BytesMut::with_capacity(length(shape));
    write(&mut buf, shape)?;
    Ok(buf.freeze())
}

/// Decodes one record content from `buf`, advancing past it.
///
/// `announced` is the shape type recorded for the file. A null record is
/// accepted under any announced type; any other type code must match it.
/// The buffer may hold further records, so Z records must carry their M
/// block here; use [`read_sized`] or [`decode`] for a content that may
/// omit it.
pub fn read<B: Buf>(buf: &mut B, announced: ShapeType) -> SpatialResult<Shape> {
    read_content(buf, announced, MeasureBlock::Required)
}

/// Decodes a complete record content held in memory.
///
/// The content is bounded to one record, so the M block of a Z record may
/// be missing.
pub fn decode(content: &[u8], announced: ShapeType) -> SpatialResult<Shape> {
    let mut buf = content;
    read_content(&mut buf, announced, MeasureBlock::OptionalForZ)
}

/// Decodes the record content of `content_len` bytes at the front of `buf`
/// and advances past exactly that many bytes.
///
/// This is the streaming counterpart of [`decode`]: the length comes from
/// the record header, so a Z record without its M block is read correctly
/// even when more records follow. Bytes of the content left over after the
/// shape are skipped.
pub fn read_sized<B: Buf>(
    buf: &mut B,
    content_len: usize,
    announced: ShapeType,
) -> SpatialResult<Shape> {
    ensure(buf, content_len, "record content")?;
    let mut content = (&mut *buf).take(content_len);
    let shape = read_content(&mut content, announced, MeasureBlock::OptionalForZ)?;
    let rest = content.remaining();
    content.advance(rest);
    Ok(shape)
}

/// Whether a Z record may end before its M block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeasureBlock {
    Required,
    OptionalForZ,
}

impl MeasureBlock {
    fn present<B: Buf>(self, buf: &B, dimension: Dimension, block_len: usize) -> bool {
        if !dimension.has_m() {
            return false;
        }
        match self {
            MeasureBlock::Required => true,
            MeasureBlock::OptionalForZ => !dimension.has_z() || buf.remaining() >= block_len,
        }
    }
}

fn read_content<B: Buf>(
    buf: &mut B,
    announced: ShapeType,
    measures: MeasureBlock,
) -> SpatialResult<Shape> {
    ensure(buf, TYPE_LEN, "shape type")?;
    let declared = ShapeType::from_code(buf.get_i32_le())?;

    if declared.is_null() {
        return Ok(Shape::Null);
    }
    if declared != announced {
        return Err(SpatialError::Format(format!(
            "record declares {} but the file holds {}",
            declared, announced
        )));
    }

    let dimension = declared.dimension();
    match declared.kind() {
        ShapeKind::Null => Ok(Shape::Null),
        ShapeKind::Point => read_point(buf, dimension, measures),
        ShapeKind::MultiPoint => {
            ensure(buf, BOX_LEN + COUNT_LEN, "multipoint header")?;
            buf.advance(BOX_LEN);
            let n = read_count(buf, "point")?;
            let points = read_ordinates(buf, dimension, n, measures)?;
            Ok(Shape::MultiPoint { dimension, points })
        }
        kind @ (ShapeKind::PolyLine | ShapeKind::Polygon) => {
            ensure(buf, BOX_LEN + 2 * COUNT_LEN, "multi-part header")?;
            buf.advance(BOX_LEN);
            let num_parts = read_count(buf, "part")?;
            let num_points = read_count(buf, "point")?;

            ensure(buf, num_parts * COUNT_LEN, "part offsets")?;
            let offsets = (0..num_parts)
                .map(|_| buf.get_i32_le())
                .collect::<Vec<_>>();
            validate_offsets(&offsets, num_points)?;

            let mut points = read_ordinates(buf, dimension, num_points, measures)?;
            let mut parts = Vec::with_capacity(num_parts);
            for window in offsets.iter().rev() {
                let start = *window as usize;
                parts.push(points.split_off(start));
            }
            parts.reverse();

            if kind == ShapeKind::Polygon {
                Ok(Shape::Polygon {
                    dimension,
                    rings: parts,
                })
            } else {
                Ok(Shape::PolyLine { dimension, parts })
            }
        }
    }
}

fn read_point<B: Buf>(
    buf: &mut B,
    dimension: Dimension,
    measures: MeasureBlock,
) -> SpatialResult<Shape> {
    ensure(buf, XY_LEN, "point")?;
    let x = buf.get_f64_le();
    let y = buf.get_f64_le();
    let mut coord = Coordinate::xy(x, y);

    if dimension.has_z() {
        ensure(buf, ORDINATE_LEN, "point z")?;
        coord.z = buf.get_f64_le();
    }
    if measures.present(buf, dimension, ORDINATE_LEN) {
        ensure(buf, ORDINATE_LEN, "point measure")?;
        coord.m = measure(buf.get_f64_le());
    }

    Ok(Shape::Point { dimension, coord })
}

fn read_ordinates<B: Buf>(
    buf: &mut B,
    dimension: Dimension,
    n: usize,
    measures: MeasureBlock,
) -> SpatialResult<Vec<Coordinate>> {
    ensure(buf, n * XY_LEN, "coordinates")?;
    let mut coords = (0..n)
        .map(|_| {
            let x = buf.get_f64_le();
            let y = buf.get_f64_le();
            Coordinate::xy(x, y)
        })
        .collect::<Vec<_>>();

    let block_len = RANGE_LEN + n * ORDINATE_LEN;
    if dimension.has_z() {
        ensure(buf, block_len, "z block")?;
        buf.advance(RANGE_LEN);
        for c in coords.iter_mut() {
            c.z = buf.get_f64_le();
        }
    }
    if measures.present(buf, dimension, block_len) {
        ensure(buf, block_len, "measure block")?;
        buf.advance(RANGE_LEN);
        for c in coords.iter_mut() {
            c.m = measure(buf.get_f64_le());
        }
    }

    Ok(coords)
}

fn put_box<B: BufMut>(buf: &mut B, extent: &ShapeExtent) {
    buf.put_f64_le(extent.bbox.min_x);
    buf.put_f64_le(extent.bbox.min_y);
    buf.put_f64_le(extent.bbox.max_x);
    buf.put_f64_le(extent.bbox.max_y);
}

fn put_ordinates<'a, B, I>(buf: &mut B, dimension: Dimension, extent: &ShapeExtent, coords: I)
where
    B: BufMut,
    I: Iterator<Item = &'a Coordinate> + Clone,
{
    for c in coords.clone() {
        buf.put_f64_le(c.x);
        buf.put_f64_le(c.y);
    }
    if dimension.has_z() {
        buf.put_f64_le(extent.z_range.0);
        buf.put_f64_le(extent.z_range.1);
        for c in coords.clone() {
            buf.put_f64_le(c.z);
        }
    }
    if dimension.has_m() {
        let (lo, hi) = extent.m_range.unwrap_or((NO_DATA, NO_DATA));
        buf.put_f64_le(lo);
        buf.put_f64_le(hi);
        for c in coords {
            buf.put_f64_le(c.m.unwrap_or(NO_DATA));
        }
    }
}

fn measure(value: f64) -> Option<f64> {
    if value < NO_DATA_THRESHOLD || value.is_nan() {
        None
    } else {
        Some(value)
    }
}

fn read_count<B: Buf>(buf: &mut B, what: &str) -> SpatialResult<usize> {
    let count = buf.get_i32_le();
    if count < 0 {
        return Err(SpatialError::Format(format!(
            "negative {} count {}",
            what, count
        )));
    }
    Ok(count as usize)
}

fn validate_offsets(offsets: &[i32], num_points: usize) -> SpatialResult<()> {
    if offsets.is_empty() {
        if num_points > 0 {
            return Err(SpatialError::Format(format!(
                "{} points but no parts",
                num_points
            )));
        }
        return Ok(());
    }
    if offsets[0] != 0 {
        return Err(SpatialError::Format(format!(
            "first part starts at {} instead of 0",
            offsets[0]
        )));
    }
    let mut previous = 0;
    for &offset in offsets {
        if offset < previous || offset as usize > num_points {
            return Err(SpatialError::Format(format!(
                "part offset {} out of order or beyond {} points",
                offset, num_points
            )));
        }
        previous = offset;
    }
    Ok(())
}

fn ensure<B: Buf>(buf: &B, needed: usize, what: &str) -> SpatialResult<()> {
    if buf.remaining() < needed {
        return Err(SpatialError::Format(format!(
            "truncated record: {} needs {} bytes, {} left",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn ring() -> Vec<Coordinate> {
        vec![
            Coordinate::xyzm(0.0, 0.0, 1.0, 10.0),
            Coordinate::xyzm(0.0, 10.0, 2.0, 20.0),
            Coordinate::xyzm(10.0, 10.0, 3.0, 30.0),
            Coordinate::xyzm(10.0, 0.0, 4.0, 40.0),
            Coordinate::xyzm(0.0, 0.0, 1.0, 10.0),
        ]
    }

    fn round_trip(shape: &Shape) -> Shape {
        let bytes = encode(shape).unwrap();
        assert_eq!(bytes.len(), length(shape));
        decode(&bytes, shape.shape_type()).unwrap()
    }

    #[test]
    fn test_polygon_length_matches_written_bytes() {
        for (dimension, expected) in [
            (Dimension::Xy, 128),
            (Dimension::Xym, 184),
            (Dimension::Xyzm, 240),
        ] {
            let polygon = Shape::polygon(dimension, vec![ring()]);
            assert_eq!(length(&polygon), expected);

            let mut buf = Vec::new();
            write(&mut buf, &polygon).unwrap();
            assert_eq!(buf.len(), expected);
        }
    }

    #[test]
    fn test_point_layouts() {
        let xy = Shape::point(Dimension::Xy, Coordinate::xy(1.5, -2.5));
        let bytes = encode(&xy).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[..4], &1i32.to_le_bytes());
        assert_eq!(&bytes[4..12], &1.5f64.to_le_bytes());
        assert_eq!(&bytes[12..20], &(-2.5f64).to_le_bytes());

        assert_eq!(length(&Shape::point(Dimension::Xym, Coordinate::xy(0.0, 0.0))), 28);
        assert_eq!(length(&Shape::point(Dimension::Xyzm, Coordinate::xy(0.0, 0.0))), 36);
    }

    #[test]
    fn test_round_trip_all_kinds() {
        for dimension in [Dimension::Xy, Dimension::Xym, Dimension::Xyzm] {
            let shapes = vec![
                Shape::point(dimension, Coordinate::xyzm(3.0, 4.0, 5.0, 6.0)),
                Shape::multi_point(dimension, ring()),
                Shape::polyline(dimension, vec![ring(), ring()[..2].to_vec()]),
                Shape::polygon(dimension, vec![ring()]),
            ];
            for shape in shapes {
                assert_eq!(round_trip(&shape), shape);
            }
        }
    }

    #[test]
    fn test_missing_measures_use_sentinel() {
        let shape = Shape::multi_point(
            Dimension::Xym,
            vec![Coordinate::xy(1.0, 1.0), Coordinate::xym(2.0, 2.0, 7.0)],
        );
        let bytes = encode(&shape).unwrap();

        // type, box, count, two xy pairs, m range, then the first measure
        let first_m = 4 + 32 + 4 + 32 + 16;
        let raw = f64::from_le_bytes(bytes[first_m..first_m + 8].try_into().unwrap());
        assert_eq!(raw, NO_DATA);

        assert_eq!(round_trip(&shape), shape);
    }

    #[test]
    fn test_empty_geometry_encodes_as_null() {
        let empty = Shape::polyline(Dimension::Xy, vec![]);
        assert_eq!(length(&empty), 4);
        let bytes = encode(&empty).unwrap();
        assert_eq!(&bytes[..], &0i32.to_le_bytes());
        assert_eq!(decode(&bytes, ShapeType::PolyLine).unwrap(), Shape::Null);
        assert_eq!(round_trip(&null_shape()), Shape::Null);
    }

    #[test]
    fn test_multipart_offsets() {
        let line = Shape::polyline(
            Dimension::Xy,
            vec![
                vec![Coordinate::xy(0.0, 0.0), Coordinate::xy(1.0, 1.0)],
                vec![
                    Coordinate::xy(5.0, 5.0),
                    Coordinate::xy(6.0, 6.0),
                    Coordinate::xy(7.0, 5.0),
                ],
            ],
        );
        let bytes = encode(&line).unwrap();
        let offsets = &bytes[4 + 32 + 8..4 + 32 + 16];
        assert_eq!(&offsets[..4], &0i32.to_le_bytes());
        assert_eq!(&offsets[4..], &2i32.to_le_bytes());
        assert_eq!(round_trip(&line), line);
    }

    #[test]
    fn test_z_record_without_measure_block() {
        let shape = Shape::multi_point(
            Dimension::Xyzm,
            vec![Coordinate::xyz(1.0, 2.0, 3.0), Coordinate::xyz(4.0, 5.0, 6.0)],
        );
        let bytes = encode(&shape).unwrap();
        let without_m = &bytes[..bytes.len() - (16 + 2 * 8)];
        assert_eq!(decode(without_m, ShapeType::MultiPointZ).unwrap(), shape);
    }

    #[test]
    fn test_type_mismatch_is_format_error() {
        let point = Shape::point(Dimension::Xy, Coordinate::xy(1.0, 1.0));
        let bytes = encode(&point).unwrap();
        let err = decode(&bytes, ShapeType::MultiPoint).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_truncated_record_is_format_error() {
        let polygon = Shape::polygon(Dimension::Xym, vec![ring()]);
        let bytes = encode(&polygon).unwrap();
        let err = decode(&bytes[..60], ShapeType::PolygonM).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_bad_part_offsets_are_rejected() {
        let mut buf = Vec::new();
        buf.put_i32_le(ShapeType::PolyLine.code());
        for _ in 0..4 {
            buf.put_f64_le(0.0);
        }
        buf.put_i32_le(2);
        buf.put_i32_le(2);
        buf.put_i32_le(0);
        buf.put_i32_le(5);
        for _ in 0..4 {
            buf.put_f64_le(0.0);
        }
        let err = decode(&buf, ShapeType::PolyLine).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_read_advances_past_record() {
        let a = Shape::point(Dimension::Xy, Coordinate::xy(1.0, 1.0));
        let b = Shape::point(Dimension::Xy, Coordinate::xy(2.0, 2.0));
        let mut buf = BytesMut::new();
        write(&mut buf, &a).unwrap();
        write(&mut buf, &b).unwrap();

        let mut reader = buf.freeze();
        assert_eq!(read(&mut reader, ShapeType::Point).unwrap(), a);
        assert_eq!(read(&mut reader, ShapeType::Point).unwrap(), b);
        assert!(!reader.has_remaining());
    }

    #[test]
    fn test_sized_read_of_z_records_without_measures() {
        let first = Shape::point(Dimension::Xyzm, Coordinate::xyz(1.0, 2.0, 3.0));
        let second = Shape::point(Dimension::Xyzm, Coordinate::xyzm(4.0, 5.0, 6.0, 7.0));
        let points = Shape::multi_point(
            Dimension::Xyzm,
            vec![Coordinate::xyz(1.0, 1.0, 1.0), Coordinate::xyz(2.0, 2.0, 2.0)],
        );

        // point and multipoint written by a tool that omits the M block
        let first_bytes = encode(&first).unwrap();
        let first_len = first_bytes.len() - ORDINATE_LEN;
        let points_bytes = encode(&points).unwrap();
        let points_len = points_bytes.len() - (RANGE_LEN + 2 * ORDINATE_LEN);

        let mut stream = BytesMut::new();
        stream.put_slice(&first_bytes[..first_len]);
        stream.put_slice(&points_bytes[..points_len]);
        write(&mut stream, &second).unwrap();
        let total = stream.len();

        let mut reader = stream.freeze();
        assert_eq!(read_sized(&mut reader, first_len, ShapeType::PointZ).unwrap(), first);
        assert_eq!(reader.remaining(), total - first_len);
        assert_eq!(
            read_sized(&mut reader, points_len, ShapeType::MultiPointZ).unwrap(),
            points
        );
        assert_eq!(reader.remaining(), length(&second));
        assert_eq!(
            read_sized(&mut reader, length(&second), ShapeType::PointZ).unwrap(),
            second
        );
        assert!(!reader.has_remaining());
    }

    #[test]
    fn test_unsized_read_requires_measure_block_of_z_records() {
        let a = Shape::point(Dimension::Xyzm, Coordinate::xyzm(1.0, 2.0, 3.0, 4.0));
        let b = Shape::multi_point(
            Dimension::Xyzm,
            vec![Coordinate::xyz(1.0, 1.0, 1.0), Coordinate::xyz(2.0, 2.0, 2.0)],
        );
        let mut buf = BytesMut::new();
        write(&mut buf, &a).unwrap();
        write(&mut buf, &b).unwrap();

        let mut reader = buf.freeze();
        assert_eq!(read(&mut reader, ShapeType::PointZ).unwrap(), a);
        assert_eq!(reader.remaining(), length(&b));
        assert_eq!(read(&mut reader, ShapeType::MultiPointZ).unwrap(), b);
        assert!(!reader.has_remaining());

        // without a content length a missing M block is a truncated record
        let bytes = encode(&a).unwrap();
        let mut short = &bytes[..bytes.len() - ORDINATE_LEN];
        let err = read(&mut short, ShapeType::PointZ).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_sized_read_skips_trailing_content() {
        let point = Shape::point(Dimension::Xy, Coordinate::xy(1.0, 2.0));
        let mut buf = BytesMut::new();
        write(&mut buf, &point).unwrap();
        buf.put_u32_le(0);
        write(&mut buf, &point).unwrap();

        let mut reader = buf.freeze();
        assert_eq!(read_sized(&mut reader, 24, ShapeType::Point).unwrap(), point);
        assert_eq!(read_sized(&mut reader, 20, ShapeType::Point).unwrap(), point);
        assert!(!reader.has_remaining());
        assert_eq!(
            read_sized(&mut reader, 20, ShapeType::Point).unwrap_err().kind(),
            ErrorKind::Format
        );
    }

    #[test]
    fn test_count_fields_are_range_checked() {
        assert_eq!(count_field(7, "point count").unwrap(), 7);
        assert_eq!(count_field(i32::MAX as usize, "point count").unwrap(), i32::MAX);
        let err = count_field(i32::MAX as usize + 1, "point count").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let line = Shape::polyline(
            Dimension::Xy,
            vec![
                vec![Coordinate::xy(0.0, 0.0), Coordinate::xy(1.0, 1.0)],
                vec![Coordinate::xy(2.0, 2.0); 3],
            ],
        );
        assert_eq!(counts(&line).unwrap(), (5, 2, vec![0, 2]));
        assert_eq!(counts(&Shape::null()).unwrap(), (0, 0, vec![]));
    }

    #[test]
    fn test_hand_built_shape_decodes_normalized() {
        let raw = Shape::Point {
            dimension: Dimension::Xym,
            coord: Coordinate {
                x: 1.0,
                y: 2.0,
                z: 9.0,
                m: Some(NO_DATA),
            },
        };
        let decoded = decode(&encode(&raw).unwrap(), ShapeType::PointM).unwrap();
        assert_ne!(decoded, raw);
        assert_eq!(decoded, raw.clone().normalized());
        assert_eq!(
            raw.normalized(),
            Shape::point(Dimension::Xym, Coordinate::xy(1.0, 2.0))
        );

        let line = Shape::PolyLine {
            dimension: Dimension::Xy,
            parts: vec![vec![Coordinate::xyzm(0.0, 0.0, 5.0, 6.0), Coordinate::xy(1.0, 1.0)]],
        };
        let decoded = decode(&encode(&line).unwrap(), ShapeType::PolyLine).unwrap();
        assert_eq!(decoded, line.normalized());
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let polygon = Shape::polygon(Dimension::Xy, vec![ring()]);
        let mut storage = [0u8; 16];
        let mut slice = &mut storage[..];
        assert!(write(&mut slice, &polygon).is_err());
    }
}
