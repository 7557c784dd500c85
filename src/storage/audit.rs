//! Ingestion audit store
//!
//! One row per successfully persisted source file. The harvester consults
//! the store before writing anything and refuses files that are already
//! present, which keeps harvesting idempotent. Store failures are fatal to
//! the whole batch.

use crate::error::{HarvestError, Result};
use crate::models::{FileOutcome, FileResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// One ingestion row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub source: String,
    /// A file-level error was recorded for this source
    pub has_error: bool,
    pub run_error_count: usize,
    pub run_success_count: usize,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Build the row for a file result, stamped with the current time
    pub fn for_file(file: &FileResult) -> Self {
        let (has_error, run_error_count, run_success_count) = match &file.outcome {
            FileOutcome::Harvested { stats, .. } => {
                (false, stats.run_error_count, stats.run_success_count)
            }
            FileOutcome::Failed { .. } => (true, 0, 0),
        };

        Self {
            source: file.source_file.clone(),
            has_error,
            run_error_count,
            run_success_count,
            created_at: Utc::now(),
        }
    }
}

/// Durable record of which sources have been ingested
pub trait AuditStore: Send + Sync {
    /// Whether a row for `source` exists
    fn exists(&self, source: &str) -> Result<bool>;

    /// Append a row
    fn insert(&self, record: AuditRecord) -> Result<()>;
}

/// Audit store kept as a JSON array in a single file
///
/// A missing file is an empty store. Writes go through a temporary file and
/// a rename so a crash never leaves a truncated store behind.
#[derive(Debug)]
pub struct JsonAuditStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All rows currently in the store
    pub fn records(&self) -> Result<Vec<AuditRecord>> {
        let _guard = self.guard()?;
        self.load()
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| self.failure("store lock poisoned"))
    }

    fn load(&self) -> Result<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(|e| self.failure(e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| self.failure(e))
    }

    fn save(&self, records: &[AuditRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.failure(e))?;
        }

        let staging = self.path.with_extension("json.tmp");
        let file = File::create(&staging).map_err(|e| self.failure(e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, records).map_err(|e| self.failure(e))?;
        writer.flush().map_err(|e| self.failure(e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.failure(e))
    }

    fn failure(&self, reason: impl ToString) -> HarvestError {
        HarvestError::AuditStore {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl AuditStore for JsonAuditStore {
    fn exists(&self, source: &str) -> Result<bool> {
        let _guard = self.guard()?;
        Ok(self.load()?.iter().any(|record| record.source == source))
    }

    fn insert(&self, record: AuditRecord) -> Result<()> {
        let _guard = self.guard()?;
        let mut records = self.load()?;
        debug!("Recording ingestion of {}", record.source);
        records.push(record);
        self.save(&records)
    }
}
