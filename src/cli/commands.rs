//! Command implementations for the telemetry harvester CLI
//!
//! Sets up logging, builds the harvester from the parsed flags and prints
//! human-readable summaries.

use crate::cli::args::{Args, Commands, HarvestArgs, ShowArgs};
use crate::error::Result;
use crate::models::{FileOutcome, FileStats, RunStats};
use crate::pipeline::harvester::{BatchSummary, FileHarvester};
use crate::storage::audit::JsonAuditStore;
use crate::storage::record_store::{RecordStore, StoredFile};
use colored::*;
use std::fs;
use std::time::Instant;
use tracing::{debug, info};

/// Main command runner
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Commands::Harvest(harvest) => {
            run_harvest(harvest).await?;
        }
        Commands::Show(show) => run_show(show)?,
    }
    Ok(())
}

/// Harvest the data directory into the cache and print a summary
pub async fn run_harvest(args: &HarvestArgs) -> Result<BatchSummary> {
    let start_time = Instant::now();
    let config = args.to_config();

    fs::create_dir_all(&args.cache_dir)?;
    let records = RecordStore::new(&args.cache_dir);
    let audit = JsonAuditStore::new(args.audit_path());
    let harvester = FileHarvester::new(config, records, audit)?;

    info!(
        "Harvesting {} into {} ({:?} mode, {} workers)",
        args.data_dir.display(),
        args.cache_dir.display(),
        harvester.config().execution_mode(),
        harvester.config().workers
    );

    let summary = harvester
        .harvest_directory(&args.data_dir, args.show_progress())
        .await?;

    if !args.quiet {
        print_batch_summary(&summary, start_time);
    }
    Ok(summary)
}

/// Print a harvested file's statistics followed by each run
pub fn run_show(args: &ShowArgs) -> Result<()> {
    let records = RecordStore::new(&args.cache_dir);
    let stored = records.read(&args.file)?;
    print_stored_file(&stored);
    Ok(())
}

fn print_batch_summary(summary: &BatchSummary, start_time: Instant) {
    println!();
    println!("{}", "Harvest Summary".bold().green());
    println!("{}", "===============".green());
    println!(
        "  Files:    {} harvested, {} failed, {} total",
        summary.counts.success_count.to_string().green(),
        summary.counts.error_count.to_string().red(),
        summary.counts.total_count
    );

    for (source, file) in &summary.files {
        match &file.outcome {
            FileOutcome::Harvested { stats, .. } => println!(
                "  {} {}: {} of {} runs succeeded",
                "✓".green(),
                source,
                stats.run_success_count,
                stats.run_total_count
            ),
            FileOutcome::Failed { error } => {
                let headline = error.lines().next().unwrap_or_default();
                println!("  {} {}: {}", "✗".red(), source, headline.red());
            }
        }
    }

    println!("  Elapsed:  {:.2?}", start_time.elapsed());
}

fn print_stored_file(stored: &StoredFile) {
    println!("{} {}", "Source file:".bold(), stored.source_file);

    if let Some(stats) = &stored.file_stats {
        print_file_stats(stats);
    }
    if let Some(error) = &stored.error {
        println!("{}", error.red());
    }

    for run in &stored.runs {
        println!();
        println!("{} {}", "Run".bold().cyan(), run.record.run_id);

        if let Some(stats) = &run.record.run_stats {
            print_run_stats(stats);
        }
        match (&run.table, &run.record.error) {
            (Some(table), _) => println!("{}", table),
            (None, Some(error)) => println!("{}", error.red()),
            (None, None) => {}
        }
    }
}

fn print_file_stats(stats: &FileStats) {
    println!("  run_error_count: {}", stats.run_error_count);
    println!("  run_success_count: {}", stats.run_success_count);
    println!("  run_total_count: {}", stats.run_total_count);
}

fn print_run_stats(stats: &RunStats) {
    println!("  available_channels: {}", stats.available_channels.join(", "));
    println!("  start_time: {}", stats.start_time);
    println!("  stop_time: {}", stats.stop_time);
    for (robot, distance) in &stats.total_distance {
        println!("  total_distance[{}]: {:.6}", robot, distance);
    }
    println!("  total_runtime_seconds: {:.3}", stats.total_runtime_seconds);
}

/// Set up logging based on CLI arguments
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("telemetry_harvester={}", log_level)));

    let layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when running inside tests
    let installed = if args.is_quiet() {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_timer(fmt::time::uptime()))
            .try_init()
    };

    if installed.is_ok() {
        debug!("Logging initialized at level: {}", log_level);
    }
}
