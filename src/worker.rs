use crossbeam_channel::unbounded;
use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::engine::EngineHandle;
use crate::errors::{Result, SegBatchError};
use crate::job::{Job, JobOutcome};
use crate::traits::SegmentationEngine;

/// Fixed-size pool of worker threads that executes jobs against a shared engine.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(SegBatchError::Configuration {
                message: "worker count must be at least 1".to_string(),
            });
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("seg-worker-{index}"))
            .build()
            .map_err(|e| SegBatchError::WorkerPool {
                operation: format!("building {workers} worker threads"),
                source: Box::new(e),
            })?;
        Ok(Self { pool, workers })
    }

    pub const fn worker_count(&self) -> usize {
        self.workers
    }

    /// Submit every job, then block until each one has produced its outcome.
    ///
    /// `on_outcome` runs on the calling thread, once per job, in completion order.
    pub fn run_all<E, F>(&self, jobs: Vec<Job>, engine: &EngineHandle<E>, mut on_outcome: F)
    where
        E: SegmentationEngine,
        F: FnMut(Job, JobOutcome),
    {
        let submitted = jobs.len();
        let (tx, rx) = unbounded();

        self.pool.in_place_scope(|scope| {
            for job in jobs {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = job.execute(engine);
                    // the collector only stops once every sender is gone
                    let _ = tx.send((job, outcome));
                });
            }
            drop(tx);
            debug!("Submitted {submitted} job(s) to {} worker(s)", self.workers);

            for (job, outcome) in rx.iter() {
                on_outcome(job, outcome);
            }
        });
    }
}
