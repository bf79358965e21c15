use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shapeindex::{
    BoundingBox, DiskRTree, ErrorKind, RTreeConfig, RecordPointer, SpatialIndex, SplitAlgorithm,
};
use shapeindex_int_test::test_util::{cleanup, create_test_context, run_test, small_config};
use std::sync::Arc;
use std::thread;

fn sorted(tree: &DiskRTree, query: &BoundingBox) -> Vec<RecordPointer> {
    let mut pointers = tree
        .intersects(query)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    pointers.sort();
    pointers
}

#[test]
fn test_split_on_third_point() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = DiskRTree::create(
                ctx.file("three.idx"),
                small_config(2, 1, SplitAlgorithm::Quadratic),
            )?;
            tree.insert(&BoundingBox::from_point(0.0, 0.0), RecordPointer::new(0, 100))?;
            tree.insert(&BoundingBox::from_point(10.0, 10.0), RecordPointer::new(0, 128))?;
            tree.insert(&BoundingBox::from_point(20.0, 20.0), RecordPointer::new(0, 156))?;

            assert_eq!(tree.len(), 3);
            assert_eq!(tree.height(), 2);
            assert_eq!(
                sorted(&tree, &BoundingBox::new(-1.0, -1.0, 11.0, 11.0)),
                vec![RecordPointer::new(0, 100), RecordPointer::new(0, 128)]
            );
            tree.close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_invalid_configurations() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("never.idx");

            let err = RTreeConfig::builder()
                .max_entries(50)
                .min_entries(26)
                .build()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);

            let err = RTreeConfig::builder()
                .split_algorithm_name("r*")
                .build()
                .and_then(|config| DiskRTree::create(&path, config))
                .err()
                .unwrap();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert!(!path.exists());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_random_workload_keeps_tree_valid() {
    run_test(
        || create_test_context(),
        |ctx| {
            for algorithm in [SplitAlgorithm::Linear, SplitAlgorithm::Quadratic] {
                let tree = DiskRTree::create(
                    ctx.file(&format!("{}.idx", algorithm)),
                    small_config(8, 3, algorithm),
                )?;
                let mut rng = StdRng::seed_from_u64(7);
                let mut live: Vec<(BoundingBox, RecordPointer)> = Vec::new();

                for round in 0..5u32 {
                    for i in 0..300u32 {
                        let x = rng.random_range(0.0..1000.0);
                        let y = rng.random_range(0.0..1000.0);
                        let bbox = BoundingBox::new(x, y, x + rng.random_range(0.0..10.0), y + 1.0);
                        let pointer = RecordPointer::new(round, i * 8);
                        tree.insert(&bbox, pointer)?;
                        live.push((bbox, pointer));
                    }
                    for _ in 0..150 {
                        let victim = rng.random_range(0..live.len());
                        let (bbox, pointer) = live.swap_remove(victim);
                        assert!(tree.delete(&bbox, pointer)?);
                    }

                    let report = tree.check_integrity()?;
                    assert!(report.is_valid(), "{}: {:?}", algorithm, report.errors);
                    assert_eq!(tree.len(), live.len() as u64);
                }

                let query = BoundingBox::new(250.0, 250.0, 600.0, 400.0);
                let mut expected: Vec<RecordPointer> = live
                    .iter()
                    .filter(|(b, _)| b.intersects(&query))
                    .map(|(_, p)| *p)
                    .collect();
                expected.sort();
                assert_eq!(sorted(&tree, &query), expected);
                tree.close()?;
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_split_policies_agree_on_results() {
    run_test(
        || create_test_context(),
        |ctx| {
            let linear = DiskRTree::create(
                ctx.file("linear.idx"),
                small_config(5, 2, SplitAlgorithm::Linear),
            )?;
            let quadratic = DiskRTree::create(
                ctx.file("quadratic.idx"),
                small_config(5, 2, SplitAlgorithm::Quadratic),
            )?;

            for i in 0..200u32 {
                let x = ((i * 37) % 101) as f64;
                let y = ((i * 53) % 97) as f64;
                let bbox = BoundingBox::new(x, y, x + 2.0, y + 2.0);
                linear.insert(&bbox, RecordPointer::new(0, i))?;
                quadratic.insert(&bbox, RecordPointer::new(0, i))?;
            }

            for query in [
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(40.0, 20.0, 70.0, 90.0),
                BoundingBox::from_point(50.0, 50.0),
            ] {
                assert_eq!(sorted(&linear, &query), sorted(&quadratic, &query));
            }
            linear.close()?;
            quadratic.close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_shared_readers() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = Arc::new(DiskRTree::create(
                ctx.file("shared.idx"),
                small_config(6, 2, SplitAlgorithm::Quadratic),
            )?);
            for i in 0..500u32 {
                let x = (i % 25) as f64;
                let y = (i / 25) as f64;
                tree.insert(&BoundingBox::new(x, y, x + 0.5, y + 0.5), RecordPointer::new(0, i))?;
            }

            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let tree = tree.clone();
                    thread::spawn(move || {
                        let x = (t * 5) as f64;
                        let query = BoundingBox::new(x, 0.0, x + 4.9, 19.9);
                        tree.intersects(&query).unwrap().count()
                    })
                })
                .collect();

            for handle in handles {
                // five columns of twenty rows each
                assert_eq!(handle.join().unwrap(), 100);
            }
            tree.close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_spatial_index_trait() {
    fn load<I: SpatialIndex>(index: &I) -> shapeindex::SpatialResult<usize> {
        for i in 0..10u32 {
            index.insert(&BoundingBox::from_point(i as f64, 0.0), RecordPointer::new(1, i))?;
        }
        index.delete(&BoundingBox::from_point(3.0, 0.0), RecordPointer::new(1, 3))?;
        Ok(index
            .intersects(&BoundingBox::new(0.0, -1.0, 5.0, 1.0))?
            .filter(|r| r.is_ok())
            .count())
    }

    run_test(
        || create_test_context(),
        |ctx| {
            let tree = DiskRTree::create(ctx.file("trait.idx"), RTreeConfig::default())?;
            assert_eq!(load(&tree)?, 5);
            assert_eq!(SpatialIndex::len(&tree), 9);
            assert!(!SpatialIndex::is_empty(&tree));
            SpatialIndex::close(&tree)
        },
        |ctx| cleanup(ctx),
    )
}
