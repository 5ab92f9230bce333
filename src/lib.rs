pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod imageops;
pub mod job;
pub mod logger;
pub mod model;
pub mod paths;
pub mod plan;
pub mod progress_tracker;
pub mod traits;
pub mod worker;

pub mod mocks;

use std::fs;
use std::path::Path;

use log::info;

pub use config::{Config, EngineAccess, EngineSpec, RunOptions};
pub use discovery::{discover, ImageFile};
pub use engine::EngineHandle;
pub use errors::{Result, SegBatchError};
pub use job::{Job, JobOutcome};
pub use model::OnnxEngine;
pub use progress_tracker::{ProgressTracker, RunSummary};
pub use traits::*;

use crate::plan::plan_jobs;
use crate::worker::WorkerPool;

/// Runs a whole directory through one loaded engine.
pub struct BatchProcessor<E: SegmentationEngine> {
    engine: EngineHandle<E>,
    options: RunOptions,
    show_progress: bool,
}

impl<E: SegmentationEngine> BatchProcessor<E> {
    pub const fn new(engine: EngineHandle<E>, options: RunOptions) -> Self {
        Self {
            engine,
            options,
            show_progress: true,
        }
    }

    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn engine(&self) -> &EngineHandle<E> {
        &self.engine
    }

    /// Process every supported image under `input_dir`.
    ///
    /// Only an invalid input directory or a broken configuration is returned as an
    /// error; per-file failures are counted in the summary.
    pub fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Result<RunSummary> {
        self.options.validate()?;
        let files = discover(input_dir, self.options.recursive)?;
        create_output_root(output_dir)?;

        if files.is_empty() {
            info!("No images found in {}", input_dir.display());
            return Ok(RunSummary::empty(output_dir));
        }
        self.process_files(&files, input_dir, output_dir)
    }

    fn process_files(
        &self,
        files: &[ImageFile],
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<RunSummary> {
        let plan = plan_jobs(files, input_dir, output_dir, &self.options);
        let pool = WorkerPool::new(self.options.workers)?;
        info!(
            "Found {} image(s), processing with {} worker(s)",
            plan.len(),
            pool.worker_count()
        );

        let tracker = if self.show_progress {
            ProgressTracker::new(plan.len())
        } else {
            ProgressTracker::hidden(plan.len())
        };

        for (input, outcome) in &plan.rejected {
            tracker.record(input, outcome);
        }
        pool.run_all(plan.jobs, &self.engine, |job, outcome| {
            tracker.record(&job.input, &outcome);
        });

        Ok(tracker.finish(output_dir))
    }
}

/// Discover, load the engine, then process.
///
/// The engine is loaded only when there is something to process, and before the
/// output directory is created, so a failed load leaves no trace on disk.
pub fn run<E, F>(
    input_dir: &Path,
    output_dir: &Path,
    options: RunOptions,
    init_engine: F,
) -> Result<RunSummary>
where
    E: SegmentationEngine,
    F: FnOnce() -> Result<E>,
{
    options.validate()?;
    let files = discover(input_dir, options.recursive)?;

    if files.is_empty() {
        create_output_root(output_dir)?;
        info!("No images found in {}", input_dir.display());
        return Ok(RunSummary::empty(output_dir));
    }

    let engine = EngineHandle::initialize(options.engine_access, init_engine)?;
    create_output_root(output_dir)?;
    BatchProcessor::new(engine, options).process_files(&files, input_dir, output_dir)
}

fn create_output_root(output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|e| SegBatchError::FileSystem {
        path: output_dir.to_path_buf(),
        operation: "output directory creation".to_string(),
        source: e,
    })
}
