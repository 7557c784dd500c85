//! File and directory harvesting
//!
//! Drives one source file through read, clean, segment and the run fan-out,
//! then persists the outcome through the record store and the audit store.
//! Failures are classified by scope:
//!
//! - a failing run is captured in its [`RunResult`] and the file carries on
//! - an unreadable file, a missing column or an already ingested source
//!   yields a failed [`FileResult`] and writes nothing
//! - record or audit store failures are returned as errors and stop a batch

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result, error_report};
use crate::models::{FileResult, FileStats, RawReading, ResultCounts, RunId, RunResult};
use crate::pipeline::clean::clean_readings;
use crate::pipeline::scheduler::RunScheduler;
use crate::pipeline::segment::separate_runs;
use crate::pipeline::stats::collect_outcomes;
use crate::storage::audit::{AuditRecord, AuditStore};
use crate::storage::record_store::RecordStore;
use crate::storage::source::{list_source_files, read_source_file, source_name};

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task;
use tracing::{info, warn};

/// Results of a directory harvest keyed by source name, with the file tally
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub files: BTreeMap<String, FileResult>,
    pub counts: ResultCounts,
}

/// Harvester of source files into the record cache
pub struct FileHarvester<A: AuditStore> {
    config: HarvestConfig,
    scheduler: RunScheduler,
    records: RecordStore,
    audit: A,
}

impl<A: AuditStore> FileHarvester<A> {
    /// Create a harvester, rejecting invalid configuration
    pub fn new(config: HarvestConfig, records: RecordStore, audit: A) -> Result<Self> {
        config.validate()?;
        let scheduler = RunScheduler::from_config(&config);
        Ok(Self {
            config,
            scheduler,
            records,
            audit,
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    /// Harvest one source file
    ///
    /// The file's runs are transformed first; only then is the audit store
    /// consulted. A source already present there is refused and nothing is
    /// persisted. Otherwise the record is written and an audit row inserted.
    pub async fn harvest_file(&self, path: &Path) -> Result<FileResult> {
        let source_file = source_name(path);
        let start = Instant::now();
        info!("Processing data file {}", path.display());

        let (runs, stats) = match self.transform_file(path).await {
            Ok(transformed) => transformed,
            Err(error) => {
                warn!("Failed to harvest {}: {}", path.display(), error);
                return Ok(FileResult::failed(source_file, error_report(&error)));
            }
        };

        if self.audit.exists(&source_file)? {
            let error = HarvestError::AlreadyIngested {
                source_file: source_file.clone(),
            };
            warn!("{}", error);
            return Ok(FileResult::failed(source_file, error_report(&error)));
        }

        self.records.write(&source_file, &runs, &stats)?;
        let result = FileResult::harvested(source_file, runs, stats);
        self.audit.insert(AuditRecord::for_file(&result))?;

        info!(
            "Harvested {}: {} of {} runs succeeded in {:.2?}",
            result.source_file,
            stats.run_success_count,
            stats.run_total_count,
            start.elapsed()
        );
        Ok(result)
    }

    /// Read and transform one file without touching either store
    pub async fn transform_file(
        &self,
        path: &Path,
    ) -> Result<(BTreeMap<RunId, RunResult>, FileStats)> {
        let owned: PathBuf = path.to_path_buf();
        let raw = task::spawn_blocking(move || read_source_file(&owned))
            .await
            .map_err(|e| HarvestError::Worker {
                reason: format!("source read task failed: {}", e),
            })??;

        let runs = self.transform_readings(raw).await;
        let counts = collect_outcomes(runs.iter(), "run");
        Ok((runs, counts.into()))
    }

    /// Clean, segment and transform raw readings, keyed by run id
    pub async fn transform_readings(&self, raw: Vec<RawReading>) -> BTreeMap<RunId, RunResult> {
        let cleaned = clean_readings(raw);
        let tables = separate_runs(cleaned.readings);
        self.scheduler
            .process_runs(tables)
            .await
            .into_iter()
            .map(|result| (result.run_id, result))
            .collect()
    }

    /// Harvest every regular file of a directory in lexicographic order
    pub async fn harvest_directory(
        &self,
        data_dir: &Path,
        show_progress: bool,
    ) -> Result<BatchSummary> {
        let paths = list_source_files(data_dir)?;
        info!("Found {} files in {}", paths.len(), data_dir.display());

        let progress_bar = show_progress.then(|| create_progress_bar(paths.len() as u64));

        let mut files = BTreeMap::new();
        for path in &paths {
            if let Some(pb) = &progress_bar {
                pb.set_message(format!("Harvesting {}", source_name(path)));
            }

            let result = self.harvest_file(path).await?;
            files.insert(result.source_file.clone(), result);

            if let Some(pb) = &progress_bar {
                pb.inc(1);
            }
        }

        let counts = collect_outcomes(files.iter(), "file");
        if let Some(pb) = &progress_bar {
            pb.finish_with_message(format!(
                "Harvested {} of {} files",
                counts.success_count, counts.total_count
            ));
        }

        Ok(BatchSummary { files, counts })
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
