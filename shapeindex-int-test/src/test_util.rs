use shapeindex::{
    RTreeConfig, RecordPointer, Shape, ShapeType, ShpWriter, SpatialResult, SplitAlgorithm,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, thread};

/// Runs `test` between `before` and `after`.
///
/// `after` runs even when the test fails or panics, so scratch files are
/// always removed. The original failure is reported afterwards.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> SpatialResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> SpatialResult<TestContext>,
    A: Fn(TestContext) -> SpatialResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let test_ctx = ctx.clone();
    let result = std::panic::catch_unwind(move || test(test_ctx));
    let after_result = after(ctx);

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed: {:?}", e),
        Err(panic) => std::panic::resume_unwind(panic),
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// Scratch directory of one test.
#[derive(Clone)]
pub struct TestContext {
    dir: PathBuf,
}

impl TestContext {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path of a file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("shapeindex-{}", id))
}

pub fn create_test_context() -> SpatialResult<TestContext> {
    let path = random_path();
    fs::create_dir_all(&path)?;
    Ok(TestContext::new(path))
}

pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    let max_retries = 5;
    for retry in 0..max_retries {
        match fs::remove_dir_all(ctx.path()) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) if retry < max_retries - 1 => {
                log::debug!("Retrying removal of {:?}: {}", ctx.path(), e);
                thread::sleep(Duration::from_millis(50 * (retry as u64 + 1)));
            }
            Err(e) => {
                // temp files are left for the OS to clean up
                eprintln!(
                    "Warning: Failed to remove test directory {:?}: {:?}",
                    ctx.path(),
                    e
                );
                return Ok(());
            }
        }
    }
    Ok(())
}

/// A small-page configuration that makes trees grow several levels with
/// little data.
pub fn small_config(max_entries: usize, min_entries: usize, algorithm: SplitAlgorithm) -> RTreeConfig {
    RTreeConfig::builder()
        .page_size(512)
        .max_entries(max_entries)
        .min_entries(min_entries)
        .split_algorithm(algorithm)
        .cache_pages(8)
        .build()
        .expect("valid test configuration")
}

/// Writes `shapes` into a new main file and returns the record pointers.
pub fn write_shapefile(
    path: &Path,
    shape_type: ShapeType,
    shapes: &[Shape],
) -> SpatialResult<Vec<RecordPointer>> {
    let mut writer = ShpWriter::create(path, shape_type)?;
    let pointers = shapes
        .iter()
        .map(|shape| writer.write(shape))
        .collect::<SpatialResult<Vec<_>>>()?;
    writer.finish()?;
    Ok(pointers)
}
