//! Error handling for telemetry harvesting operations.
//!
//! Provides the error taxonomy for source reading, run transformation,
//! cache persistence and the ingestion audit store.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Source file has no '{column}' column: {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Redundant samples with different values in run {run_id}: {details}")]
    ConflictingDuplicates { run_id: String, details: String },

    #[error("Run {run_id} has no rows left after pivoting")]
    EmptyRun { run_id: String },

    #[error("File {source_file} already exists in the audit store")]
    AlreadyIngested { source_file: String },

    #[error("Audit store failure at {path}: {reason}")]
    AuditStore { path: PathBuf, reason: String },

    #[error("Run worker failed: {reason}")]
    Worker { reason: String },

    #[error("No harvest record found at: {path}")]
    RecordNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, HarvestError>;

/// Render an error and its whole `source()` chain as captured failure text.
pub fn error_report(error: &(dyn std::error::Error + 'static)) -> String {
    let mut report = error.to_string();
    let mut source = error.source();
    if source.is_some() {
        report.push_str("\n\nCaused by:");
    }
    let mut depth = 0;
    while let Some(cause) = source {
        report.push_str(&format!("\n    {}: {}", depth, cause));
        depth += 1;
        source = cause.source();
    }
    report
}

/// Render a panic payload caught from a run worker.
pub fn panic_report(payload: &(dyn std::any::Any + Send)) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };
    format!("panic during run transformation: {}", message)
}
