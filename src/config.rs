//! Configuration management and validation.
//!
//! Provides the harvesting parameters passed explicitly into the pipeline.
//! Nothing in the core reads ambient environment state; the CLI maps its
//! flags onto [`HarvestConfig`].

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the run fan-out executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Bounded worker pool, runs transformed in parallel
    Parallel,
    /// Runs transformed one after another on the calling thread (profiling/debugging)
    Serial,
}

/// Global configuration for telemetry harvesting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Upper bound on concurrent run workers per file
    pub workers: usize,

    /// Fail a run when samples sharing (time, field, robot_id) disagree.
    /// Exhaustive and slow, meant for sampling new data sets.
    pub validate_duplicates: bool,

    /// Transform runs serially instead of through the worker pool
    pub profile_mode: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            validate_duplicates: false,
            profile_mode: false,
        }
    }
}

impl HarvestConfig {
    /// Create configuration with custom worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable strict duplicate validation
    pub fn with_strict_duplicates(mut self) -> Self {
        self.validate_duplicates = true;
        self
    }

    /// Toggle serial profiling mode
    pub fn with_profile_mode(mut self, profile_mode: bool) -> Self {
        self.profile_mode = profile_mode;
        self
    }

    /// Execution mode implied by the profile flag
    pub fn execution_mode(&self) -> ExecutionMode {
        if self.profile_mode {
            ExecutionMode::Serial
        } else {
            ExecutionMode::Parallel
        }
    }

    /// Reject configurations the scheduler cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(HarvestError::Configuration {
                message: "worker count must be at least 1".to_string(),
            });
        }
        debug!("Validated configuration: {:?}", self);
        Ok(())
    }
}
