use shapeindex::{
    BoundingBox, Coordinate, Dimension, DiskRTree, IndexedShapefile, RecordPointer, Shape,
    ShapeType, ShpReader, SpatialIndex, SplitAlgorithm,
};
use shapeindex_int_test::test_util::{
    cleanup, create_test_context, run_test, small_config, write_shapefile,
};

fn square(x: f64, y: f64, size: f64) -> Shape {
    Shape::polygon(
        Dimension::Xy,
        vec![vec![
            Coordinate::xy(x, y),
            Coordinate::xy(x, y + size),
            Coordinate::xy(x + size, y + size),
            Coordinate::xy(x + size, y),
            Coordinate::xy(x, y),
        ]],
    )
}

/// A 20 x 20 grid of unit squares two units apart, with a null record
/// after every tenth square.
fn parcels() -> Vec<Shape> {
    let mut shapes = Vec::new();
    for i in 0..400u32 {
        let x = (i % 20) as f64 * 2.0;
        let y = (i / 20) as f64 * 2.0;
        shapes.push(square(x, y, 1.0));
        if i % 10 == 9 {
            shapes.push(Shape::null());
        }
    }
    shapes
}

fn envelopes<S, I>(indexed: &IndexedShapefile<S, I>, query: &BoundingBox) -> Vec<BoundingBox>
where
    S: shapeindex::RecordSource,
    I: SpatialIndex,
{
    let mut found: Vec<BoundingBox> = indexed
        .query(query)
        .unwrap()
        .map(|r| r.unwrap().1.envelope().unwrap())
        .collect();
    found.sort_by(|a, b| {
        (a.min_y, a.min_x)
            .partial_cmp(&(b.min_y, b.min_x))
            .unwrap()
    });
    found
}

#[test]
fn test_build_and_query_polygons() {
    run_test(
        || create_test_context(),
        |ctx| {
            let shp = ctx.file("parcels.shp");
            write_shapefile(&shp, ShapeType::Polygon, &parcels())?;

            let tree = DiskRTree::create(
                ctx.file("parcels.idx"),
                small_config(8, 3, SplitAlgorithm::Quadratic),
            )?;
            let indexed = IndexedShapefile::build(ShpReader::open(&shp)?, tree)?;
            assert_eq!(indexed.index().len(), 400);
            assert!(indexed.index().check_integrity()?.is_valid());

            // touches the squares at x in {4, 6} and y in {4, 6}
            let found = envelopes(&indexed, &BoundingBox::new(4.5, 4.5, 6.0, 6.0));
            assert_eq!(
                found,
                vec![
                    BoundingBox::new(4.0, 4.0, 5.0, 5.0),
                    BoundingBox::new(6.0, 4.0, 7.0, 5.0),
                    BoundingBox::new(4.0, 6.0, 5.0, 7.0),
                    BoundingBox::new(6.0, 6.0, 7.0, 7.0),
                ]
            );

            // the gap between squares holds nothing
            assert!(envelopes(&indexed, &BoundingBox::new(1.2, 1.2, 1.8, 1.8)).is_empty());

            let everything = BoundingBox::new(-1.0, -1.0, 40.0, 40.0);
            assert_eq!(indexed.query(&everything)?.count(), 400);
            indexed.index().close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_query_after_delete() {
    run_test(
        || create_test_context(),
        |ctx| {
            let shp = ctx.file("parcels.shp");
            let shapes = parcels();
            let pointers = write_shapefile(&shp, ShapeType::Polygon, &shapes)?;

            let tree = DiskRTree::create(
                ctx.file("parcels.idx"),
                small_config(6, 2, SplitAlgorithm::Linear),
            )?;
            let indexed = IndexedShapefile::build(ShpReader::open(&shp)?, tree)?;

            // drop the bottom row
            let mut removed: Vec<RecordPointer> = Vec::new();
            for (pointer, shape) in pointers.iter().zip(&shapes) {
                if let Some(envelope) = shape.envelope() {
                    if envelope.min_y == 0.0 {
                        assert!(indexed.index().delete(&envelope, *pointer)?);
                        removed.push(*pointer);
                    }
                }
            }
            assert_eq!(removed.len(), 20);
            assert_eq!(indexed.index().len(), 380);

            let bottom = BoundingBox::new(-1.0, -0.5, 40.0, 1.5);
            assert_eq!(indexed.query(&bottom)?.count(), 0);

            let second_row = BoundingBox::new(-1.0, 1.5, 40.0, 3.5);
            let hits = indexed.query(&second_row)?.collect::<Result<Vec<_>, _>>()?;
            assert_eq!(hits.len(), 20);
            assert!(hits.iter().all(|(p, _)| !removed.contains(p)));

            // deleting again reports a miss
            let envelope = shapes[0].envelope().unwrap();
            assert!(!indexed.index().delete(&envelope, pointers[0])?);
            assert!(indexed.index().check_integrity()?.is_valid());
            indexed.index().close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_query_reopened_index() {
    run_test(
        || create_test_context(),
        |ctx| {
            let shp = ctx.file("parcels.shp");
            let idx = ctx.file("parcels.idx");
            let config = small_config(8, 3, SplitAlgorithm::Linear);
            write_shapefile(&shp, ShapeType::Polygon, &parcels())?;

            let tree = DiskRTree::create(&idx, config.clone())?;
            let (_, tree) = IndexedShapefile::build(ShpReader::open(&shp)?, tree)?.into_parts();
            tree.close()?;

            let indexed =
                IndexedShapefile::new(ShpReader::open(&shp)?, DiskRTree::open(&idx, config)?);
            assert_eq!(indexed.index().len(), 400);

            let column = BoundingBox::new(10.0, -1.0, 10.5, 40.0);
            let hits = indexed.query(&column)?.collect::<Result<Vec<_>, _>>()?;
            assert_eq!(hits.len(), 20);
            for (pointer, shape) in &hits {
                assert_eq!(&indexed.source().read_record(*pointer)?, shape);
                assert_eq!(shape.envelope().unwrap().min_x, 10.0);
            }
            indexed.index().close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_query_on_closed_index_fails() {
    run_test(
        || create_test_context(),
        |ctx| {
            let shp = ctx.file("parcels.shp");
            write_shapefile(&shp, ShapeType::Polygon, &parcels())?;
            let tree = DiskRTree::create(
                ctx.file("parcels.idx"),
                small_config(8, 3, SplitAlgorithm::Quadratic),
            )?;
            let indexed = IndexedShapefile::build(ShpReader::open(&shp)?, tree)?;
            indexed.index().close()?;

            let err = indexed
                .query(&BoundingBox::new(0.0, 0.0, 1.0, 1.0))
                .err()
                .unwrap();
            assert_eq!(err.kind(), shapeindex::ErrorKind::Closed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
