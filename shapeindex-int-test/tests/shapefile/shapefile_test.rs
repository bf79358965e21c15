use shapeindex::shape::{codec, NO_DATA};
use shapeindex::shapefile::{HEADER_LEN, RECORD_HEADER_LEN};
use shapeindex::{
    BoundingBox, Coordinate, Dimension, ErrorKind, RecordPointer, Shape, ShapeType, ShpReader,
    ShpWriter,
};
use shapeindex_int_test::test_util::{cleanup, create_test_context, run_test, write_shapefile};

fn ring(x: f64, y: f64, size: f64, z: f64) -> Vec<Coordinate> {
    vec![
        Coordinate::xyzm(x, y, z, 1.0),
        Coordinate::xyzm(x, y + size, z, 2.0),
        Coordinate::xyzm(x + size, y + size, z + 1.0, 3.0),
        Coordinate::xyzm(x + size, y, z + 1.0, 4.0),
        Coordinate::xyzm(x, y, z, 1.0),
    ]
}

#[test]
fn test_polygon_z_file_round_trip() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("parcels.shp");
            let shapes = vec![
                Shape::polygon(Dimension::Xyzm, vec![ring(0.0, 0.0, 10.0, 100.0)]),
                Shape::polygon(
                    Dimension::Xyzm,
                    vec![ring(20.0, 0.0, 10.0, 50.0), ring(22.0, 2.0, 2.0, 50.0)],
                ),
                Shape::null(),
                Shape::polygon(Dimension::Xyzm, vec![ring(-5.0, -5.0, 1.0, 0.0)]),
            ];
            let pointers = write_shapefile(&path, ShapeType::PolygonZ, &shapes)?;

            let reader = ShpReader::open(&path)?;
            let header = reader.header();
            assert_eq!(header.shape_type, ShapeType::PolygonZ);
            assert_eq!(header.bbox, BoundingBox::new(-5.0, -5.0, 30.0, 10.0));
            assert_eq!(header.z_range, (0.0, 101.0));
            assert_eq!(header.m_range, (1.0, 4.0));
            assert_eq!(header.file_length, std::fs::metadata(&path)?.len());

            for (pointer, shape) in pointers.iter().zip(&shapes) {
                assert_eq!(&reader.read_record(*pointer)?, shape);
            }

            let records = reader.records().collect::<Result<Vec<_>, _>>()?;
            assert_eq!(records.len(), 4);
            assert_eq!(
                records.iter().map(|(p, _)| *p).collect::<Vec<_>>(),
                pointers
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_record_offsets_follow_lengths() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("lines.shp");
            let shapes: Vec<Shape> = (0..5)
                .map(|i| {
                    let parts = (0..=i)
                        .map(|p| {
                            vec![
                                Coordinate::xym(p as f64, 0.0, p as f64),
                                Coordinate::xy(p as f64, 1.0),
                            ]
                        })
                        .collect();
                    Shape::polyline(Dimension::Xym, parts)
                })
                .collect();
            let pointers = write_shapefile(&path, ShapeType::PolyLineM, &shapes)?;

            let mut offset = HEADER_LEN as u64;
            for (pointer, shape) in pointers.iter().zip(&shapes) {
                assert_eq!(pointer.file_offset(), offset);
                offset += (RECORD_HEADER_LEN + codec::length(shape)) as u64;
            }
            assert_eq!(std::fs::metadata(&path)?.len(), offset);

            // the second vertex of every part has no measure
            let reader = ShpReader::open(&path)?;
            let shape = reader.read_record(pointers[0])?;
            let measures: Vec<Option<f64>> = shape.coordinates().map(|c| c.m).collect();
            assert_eq!(measures, vec![Some(0.0), None]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_missing_measure_written_as_sentinel() {
    let shape = Shape::multi_point(
        Dimension::Xym,
        vec![Coordinate::xy(1.0, 1.0), Coordinate::xym(2.0, 2.0, 5.0)],
    );
    let bytes = codec::encode(&shape).unwrap();
    // the measure of the first point is the first value after the M range
    let start = codec::length(&shape) - 16;
    let first_m = f64::from_le_bytes(bytes[start..start + 8].try_into().unwrap());
    assert_eq!(first_m, NO_DATA);
    assert_eq!(codec::decode(&bytes, ShapeType::MultiPointM).unwrap(), shape);
}

#[test]
fn test_writer_rejects_foreign_type() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("points.shp");
            let mut writer = ShpWriter::create(&path, ShapeType::Point)?;
            writer.write(&Shape::point(Dimension::Xy, Coordinate::xy(1.0, 1.0)))?;

            let line = Shape::polyline(
                Dimension::Xy,
                vec![vec![Coordinate::xy(0.0, 0.0), Coordinate::xy(1.0, 1.0)]],
            );
            assert_eq!(
                writer.write(&line).unwrap_err().kind(),
                ErrorKind::InvalidOperation
            );
            writer.finish()?;

            let err = ShpWriter::create(&path, ShapeType::Point).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_reader_rejects_foreign_file() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("not-a.shp");
            std::fs::write(&path, vec![0x42u8; 200])?;
            let err = ShpReader::open(&path).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::Format);

            let path = ctx.file("points.shp");
            let pointers = write_shapefile(
                &path,
                ShapeType::Point,
                &[Shape::point(Dimension::Xy, Coordinate::xy(3.0, 4.0))],
            )?;
            let reader = ShpReader::open(&path)?;
            let past_end = RecordPointer::from_file_offset(pointers[0].file_offset() + 4096)?;
            assert_eq!(
                reader.read_record(past_end).unwrap_err().kind(),
                ErrorKind::Corruption
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
