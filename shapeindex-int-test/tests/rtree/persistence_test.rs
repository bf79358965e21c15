use shapeindex::{BoundingBox, DiskRTree, ErrorKind, RecordPointer, SplitAlgorithm};
use shapeindex_int_test::test_util::{cleanup, create_test_context, run_test, small_config};

fn grid_box(i: u32) -> BoundingBox {
    let x = (i % 10) as f64 * 10.0;
    let y = (i / 10) as f64 * 10.0;
    BoundingBox::new(x, y, x + 5.0, y + 5.0)
}

#[test]
fn test_reopen_keeps_entries() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("grid.idx");
            let config = small_config(4, 2, SplitAlgorithm::Linear);

            let tree = DiskRTree::create(&path, config.clone())?;
            for i in 0..100 {
                tree.insert(&grid_box(i), RecordPointer::new(0, i))?;
            }
            let height = tree.height();
            tree.close()?;

            let tree = DiskRTree::open(&path, config.clone())?;
            assert_eq!(tree.len(), 100);
            assert_eq!(tree.height(), height);
            assert_eq!(
                tree.bounds()?,
                Some(BoundingBox::new(0.0, 0.0, 95.0, 95.0))
            );

            for i in (0..100).step_by(2) {
                assert!(tree.delete(&grid_box(i), RecordPointer::new(0, i))?);
            }
            tree.close()?;

            let tree = DiskRTree::open(&path, config)?;
            assert_eq!(tree.len(), 50);
            let mut found: Vec<RecordPointer> = tree
                .intersects(&BoundingBox::new(0.0, 0.0, 25.0, 5.0))?
                .collect::<Result<_, _>>()?;
            found.sort();
            assert_eq!(found, vec![RecordPointer::new(0, 1)]);
            assert!(tree.check_integrity()?.is_valid());
            tree.close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_freed_pages_reused_after_reopen() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("reuse.idx");
            let config = small_config(4, 2, SplitAlgorithm::Quadratic);

            let tree = DiskRTree::create(&path, config.clone())?;
            for i in 0..60 {
                tree.insert(&grid_box(i), RecordPointer::new(0, i))?;
            }
            for i in 0..60 {
                tree.delete(&grid_box(i), RecordPointer::new(0, i))?;
            }
            let stats = tree.stats();
            assert!(tree.is_empty());
            assert_eq!(stats.free_pages, stats.allocated_pages);
            tree.close()?;

            let tree = DiskRTree::open(&path, config)?;
            assert_eq!(tree.stats().free_pages, stats.free_pages);
            tree.insert(&grid_box(0), RecordPointer::new(1, 0))?;

            let after = tree.stats();
            assert_eq!(after.allocated_pages, stats.allocated_pages);
            assert_eq!(after.free_pages, stats.free_pages - 1);
            assert!(tree.check_integrity()?.is_valid());
            tree.close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_open_or_create() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("lazy.idx");
            let config = small_config(4, 2, SplitAlgorithm::Linear);

            let tree = DiskRTree::open_or_create(&path, config.clone())?;
            tree.insert(&grid_box(3), RecordPointer::new(0, 3))?;
            tree.close()?;

            let tree = DiskRTree::open_or_create(&path, config)?;
            assert_eq!(tree.len(), 1);
            tree.close()
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_layout_mismatch_on_reopen() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("layout.idx");
            DiskRTree::create(&path, small_config(4, 2, SplitAlgorithm::Linear))?.close()?;

            let err = DiskRTree::open(&path, small_config(6, 2, SplitAlgorithm::Linear))
                .err()
                .unwrap();
            assert_eq!(err.kind(), ErrorKind::Configuration);

            let err = DiskRTree::create(&path, small_config(4, 2, SplitAlgorithm::Linear))
                .err()
                .unwrap();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_truncated_file_is_corruption() {
    run_test(
        || create_test_context(),
        |ctx| {
            let path = ctx.file("truncated.idx");
            let config = small_config(4, 2, SplitAlgorithm::Linear);

            let tree = DiskRTree::create(&path, config.clone())?;
            for i in 0..40 {
                tree.insert(&grid_box(i), RecordPointer::new(0, i))?;
            }
            tree.close()?;

            // keep the header and the first node page only
            let file = std::fs::OpenOptions::new().write(true).open(&path)?;
            file.set_len(1024)?;
            drop(file);

            let tree = DiskRTree::open(&path, config)?;
            let results: Vec<_> = tree
                .intersects(&BoundingBox::new(0.0, 0.0, 100.0, 100.0))?
                .collect();
            let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
            assert_eq!(err.kind(), ErrorKind::Corruption);
            assert!(!tree.check_integrity()?.is_valid());
            tree.close()
        },
        |ctx| cleanup(ctx),
    )
}
