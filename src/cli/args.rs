//! Command-line argument definitions for the telemetry harvester
//!
//! Defines the CLI interface using the clap derive API and maps the harvest
//! flags onto [`HarvestConfig`].

use crate::config::HarvestConfig;
use crate::constants::{AUDIT_FILE_NAME, DEFAULT_CACHE_DIR, DEFAULT_DATA_DIR};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the telemetry harvester
///
/// Turns long-format robot telemetry Parquet files into per-run wide tables
/// with derived kinematics, cached alongside a JSON manifest per file.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "telemetry-harvester",
    version,
    about = "Harvest robot telemetry into per-run kinematic tables"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Harvest every source file of a data directory into the cache
    Harvest(HarvestArgs),
    /// Print a harvested file's statistics and run tables
    Show(ShowArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct HarvestArgs {
    /// Directory containing the source Parquet files
    #[arg(long = "data-dir", value_name = "PATH", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Cache directory receiving one record directory per source file
    #[arg(long = "cache-dir", value_name = "PATH", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Audit store file, defaults to audit.json inside the cache directory
    #[arg(long = "audit-file", value_name = "PATH")]
    pub audit_file: Option<PathBuf>,

    /// Transform runs serially (profiling/debugging)
    #[arg(long = "profile")]
    pub profile: bool,

    /// Upper bound on concurrent run workers, defaults to the CPU count
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Fail runs whose repeated samples carry different values
    #[arg(long = "validate-duplicates")]
    pub validate_duplicates: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: debug, -vv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors; also hides the progress bar
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Parser)]
pub struct ShowArgs {
    /// Cache directory holding the harvest records
    #[arg(long = "cache-dir", value_name = "PATH", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Source file name, with or without directory and extension
    #[arg(long = "file", value_name = "NAME")]
    pub file: String,

    /// Logging verbosity level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        match &self.command {
            Commands::Harvest(args) => args.get_log_level(),
            Commands::Show(args) => verbosity_level(args.verbose),
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(&self.command, Commands::Harvest(args) if args.quiet)
    }
}

impl HarvestArgs {
    /// Harvest configuration implied by the flags
    pub fn to_config(&self) -> HarvestConfig {
        let mut config = HarvestConfig::default().with_profile_mode(self.profile);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.validate_duplicates {
            config = config.with_strict_duplicates();
        }
        config
    }

    /// Audit store location, falling back to the cache directory
    pub fn audit_path(&self) -> PathBuf {
        self.audit_file
            .clone()
            .unwrap_or_else(|| self.cache_dir.join(AUDIT_FILE_NAME))
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            verbosity_level(self.verbose)
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

fn verbosity_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
