//! Harvest record persistence
//!
//! Every harvested file gets its own directory under the cache root, named
//! after the logical source name. It holds one Parquet table per successful
//! run and a `record.json` manifest describing all runs, successful or not.
//! Writing the same source again replaces the earlier artifacts.

use crate::constants::{RECORD_FILE_NAME, RUN_FILE_EXTENSION, RUN_FILE_PREFIX};
use crate::error::{HarvestError, Result};
use crate::models::{FileStats, RunId, RunOutcome, RunResult, RunStats};
use crate::storage::source::source_name;
use polars::prelude::{
    DataFrame, ParquetCompression, ParquetReader, ParquetWriter as PolarsParquetWriter, SerReader,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Manifest entry of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    /// Parquet file name inside the record directory, successful runs only
    pub file_name: Option<String>,
    pub run_stats: Option<RunStats>,
    pub error: Option<String>,
}

/// `record.json` manifest of one harvested file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub source_file: String,
    pub file_stats: Option<FileStats>,
    pub error: Option<String>,
    pub run_to_result: BTreeMap<RunId, RunRecord>,
}

/// A run read back from the cache, with its table when it has one
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub record: RunRecord,
    pub table: Option<DataFrame>,
}

/// A harvested file read back from the cache
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub source_file: String,
    pub file_stats: Option<FileStats>,
    pub error: Option<String>,
    pub runs: Vec<StoredRun>,
}

/// Parquet file name of a run's table
pub fn run_file_name(run_id: &RunId) -> String {
    format!("{}{}.{}", RUN_FILE_PREFIX, run_id, RUN_FILE_EXTENSION)
}

/// File-system cache of harvest records
#[derive(Debug, Clone)]
pub struct RecordStore {
    cache_dir: PathBuf,
}

impl RecordStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Record directory of a source, accepting a bare name or any path to it
    pub fn record_dir(&self, source_file: &str) -> PathBuf {
        self.cache_dir.join(source_name(Path::new(source_file)))
    }

    /// Persist the run tables and manifest of a harvested file
    ///
    /// Returns the record directory.
    pub fn write(
        &self,
        source_file: &str,
        runs: &BTreeMap<RunId, RunResult>,
        stats: &FileStats,
    ) -> Result<PathBuf> {
        let dir = self.record_dir(source_file);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;

        let mut run_to_result = BTreeMap::new();
        for (run_id, result) in runs {
            let record = match &result.outcome {
                RunOutcome::Success { table, stats } => {
                    let file_name = run_file_name(run_id);
                    let mut df = table.to_dataframe()?;
                    write_parquet(&mut df, &dir.join(&file_name))?;
                    RunRecord {
                        run_id: *run_id,
                        file_name: Some(file_name),
                        run_stats: Some(stats.clone()),
                        error: None,
                    }
                }
                RunOutcome::Failure { error } => RunRecord {
                    run_id: *run_id,
                    file_name: None,
                    run_stats: None,
                    error: Some(error.clone()),
                },
            };
            run_to_result.insert(*run_id, record);
        }

        let record = FileRecord {
            source_file: source_file.to_string(),
            file_stats: Some(*stats),
            error: None,
            run_to_result,
        };

        let manifest_path = dir.join(RECORD_FILE_NAME);
        let mut writer = BufWriter::new(File::create(&manifest_path)?);
        serde_json::to_writer_pretty(&mut writer, &record)?;
        writer.flush()?;

        info!(
            "Saved {} runs of {} to {}",
            record.run_to_result.len(),
            source_file,
            dir.display()
        );
        Ok(dir)
    }

    /// Read a file's manifest without loading any tables
    pub fn read_record(&self, source_file: &str) -> Result<FileRecord> {
        let manifest_path = self.record_dir(source_file).join(RECORD_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(HarvestError::RecordNotFound {
                path: manifest_path,
            });
        }

        let reader = BufReader::new(File::open(&manifest_path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read a file's manifest together with every stored run table
    pub fn read(&self, source_file: &str) -> Result<StoredFile> {
        let dir = self.record_dir(source_file);
        let record = self.read_record(source_file)?;

        let mut runs = Vec::with_capacity(record.run_to_result.len());
        for run in record.run_to_result.into_values() {
            let table = match &run.file_name {
                Some(file_name) => Some(read_parquet(&dir.join(file_name))?),
                None => None,
            };
            runs.push(StoredRun { record: run, table });
        }

        Ok(StoredFile {
            source_file: record.source_file,
            file_stats: record.file_stats,
            error: record.error,
            runs,
        })
    }
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    PolarsParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(df)?;
    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}
