//! Parallel run scheduling
//!
//! Fans the run transformer out over a bounded worker pool. Every run is
//! independent: a failing or panicking run becomes an error [`RunResult`]
//! and never disturbs its siblings or the pool. Results are gathered in
//! completion order, so callers must key them by run id rather than rely on
//! position.

use crate::config::{ExecutionMode, HarvestConfig};
use crate::error::{HarvestError, error_report, panic_report};
use crate::models::{RunId, RunResult, RunTable};
use crate::pipeline::transform::RunTransformer;
use futures::stream::{self, StreamExt};
use std::panic::{self, AssertUnwindSafe};
use tokio::task;
use tracing::debug;

/// Scheduler for the per-run transformation of one file
#[derive(Debug, Clone)]
pub struct RunScheduler {
    workers: usize,
    mode: ExecutionMode,
    transformer: RunTransformer,
}

impl RunScheduler {
    /// Create a scheduler with an explicit worker bound
    pub fn new(workers: usize, mode: ExecutionMode, transformer: RunTransformer) -> Self {
        Self {
            workers,
            mode,
            transformer,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.workers,
            config.execution_mode(),
            RunTransformer::from_config(config),
        )
    }

    /// Pool size used for `run_count` runs: `min(workers, run_count)`, at least 1
    pub fn pool_size(&self, run_count: usize) -> usize {
        self.workers.min(run_count).max(1)
    }

    /// Transform every run, one result per input run
    pub async fn process_runs(&self, runs: Vec<RunTable>) -> Vec<RunResult> {
        match self.mode {
            ExecutionMode::Serial => self.process_serial(runs),
            ExecutionMode::Parallel => self.process_parallel(runs).await,
        }
    }

    /// Apply the transformer to each run on the calling thread
    pub fn process_serial(&self, runs: Vec<RunTable>) -> Vec<RunResult> {
        debug!("Transforming {} runs serially", runs.len());
        runs.into_iter()
            .map(|run| transform_isolated(self.transformer, run))
            .collect()
    }

    /// Apply the transformer to each run on a bounded pool of blocking workers
    pub async fn process_parallel(&self, runs: Vec<RunTable>) -> Vec<RunResult> {
        if runs.is_empty() {
            return Vec::new();
        }

        let limit = self.pool_size(runs.len());
        debug!("Transforming {} runs with {} workers", runs.len(), limit);

        let transformer = self.transformer;
        stream::iter(runs)
            .map(|run| async move {
                let run_id = run.run_id;
                match task::spawn_blocking(move || transform_isolated(transformer, run)).await {
                    Ok(result) => result,
                    Err(join_error) => {
                        let error = HarvestError::Worker {
                            reason: join_error.to_string(),
                        };
                        RunResult::failure(run_id, error_report(&error))
                    }
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await
    }
}

/// Run the transformer with panics captured as an error result
pub fn transform_isolated(transformer: RunTransformer, run: RunTable) -> RunResult {
    let run_id = run.run_id;
    isolate_panics(run_id, move || transformer.transform(run))
}

/// Evaluate `work`, turning a panic into an error result for `run_id`
pub fn isolate_panics<F>(run_id: RunId, work: F) -> RunResult
where
    F: FnOnce() -> RunResult,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => RunResult::failure(run_id, panic_report(&*payload)),
    }
}
