//! Telemetry Harvester Library
//!
//! Turns raw long-format telemetry from a two-robot cell (encoder positions
//! and load-cell forces) into per-run wide tables with derived kinematics.
//!
//! This library provides tools for:
//! - Reading and cleaning collector Parquet files
//! - Splitting readings into independent runs
//! - Deduplicating, pivoting and forward-filling each run
//! - Deriving velocity, acceleration and magnitude channels
//! - Running runs in parallel with per-run failure isolation
//! - Caching results with a JSON manifest and an ingestion audit store

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use config::{ExecutionMode, HarvestConfig};
pub use error::{HarvestError, Result};
pub use models::{FileResult, RunId, RunResult, RunStats, WideRun};
pub use pipeline::harvester::{BatchSummary, FileHarvester};
pub use storage::audit::{AuditRecord, AuditStore, JsonAuditStore};
pub use storage::record_store::RecordStore;
