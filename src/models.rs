//! Core data structures and types for telemetry harvesting.
//!
//! Defines raw and cleaned readings, run identifiers, the wide per-run
//! table, run statistics and the tagged run/file outcomes that flow
//! through the pipeline.

use crate::constants::{columns, sensor_types};
use chrono::{DateTime, Utc};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, PolarsResult, Series, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One sample row exactly as the upstream collector wrote it
///
/// Columns that were null or could not be read as the expected kind of
/// value are `None`; the cleaner decides what survives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReading {
    pub time: Option<String>,
    pub value: Option<String>,
    pub run_id: Option<u128>,
    pub field: Option<String>,
    pub robot_id: Option<i64>,
    pub sensor_type: Option<String>,
}

/// Measured quantity of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    X,
    Y,
    Z,
    Fx,
    Fy,
    Fz,
}

impl Field {
    /// Parse a raw field name, `None` for anything outside the allowed set
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "x" => Some(Field::X),
            "y" => Some(Field::Y),
            "z" => Some(Field::Z),
            "fx" => Some(Field::Fx),
            "fy" => Some(Field::Fy),
            "fz" => Some(Field::Fz),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::X => "x",
            Field::Y => "y",
            Field::Z => "z",
            Field::Fx => "fx",
            Field::Fy => "fy",
            Field::Fz => "fz",
        }
    }

    /// Sensor that produces this field: `f*` fields come from the load cell
    pub fn sensor_type(&self) -> SensorType {
        if self.as_str().starts_with('f') {
            SensorType::LoadCell
        } else {
            SensorType::Encoder
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sensor families reported by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Encoder,
    LoadCell,
}

impl SensorType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            sensor_types::ENCODER => Some(SensorType::Encoder),
            sensor_types::LOAD_CELL => Some(SensorType::LoadCell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Encoder => sensor_types::ENCODER,
            SensorType::LoadCell => sensor_types::LOAD_CELL,
        }
    }
}

/// A validated reading; the sensor type is implied by `field`
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedReading {
    pub time: DateTime<Utc>,
    pub value: f64,
    pub run_id: u128,
    pub field: Field,
    pub robot_id: u8,
}

/// Canonical run identifier
///
/// The 128-bit run integer is the UUID's value, so the same integer always
/// renders to the same 36-character string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A reading inside one run; the run id is the table key, not a column
#[derive(Debug, Clone, PartialEq)]
pub struct RunReading {
    pub time: DateTime<Utc>,
    pub value: f64,
    pub field: Field,
    pub robot_id: u8,
}

/// Long-format readings of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct RunTable {
    pub run_id: RunId,
    pub readings: Vec<RunReading>,
}

/// Compose a channel key such as `x_1`, `vx_2` or `fz_1`
pub fn channel_name(field: &str, robot_id: u8) -> String {
    format!("{}_{}", field, robot_id)
}

/// One named column of a wide run table
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Wide, forward-filled run table indexed by ascending unique timestamps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WideRun {
    pub times: Vec<DateTime<Utc>>,
    pub columns: Vec<ChannelColumn>,
}

impl WideRun {
    /// Number of timestamp rows
    pub fn height(&self) -> usize {
        self.times.len()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.values.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    /// Column names with `time` first, the way the table is persisted
    pub fn column_names(&self) -> Vec<String> {
        std::iter::once(columns::TIME.to_string())
            .chain(self.columns.iter().map(|column| column.name.clone()))
            .collect()
    }

    /// Seconds elapsed since the previous row; the first row gets 0
    pub fn time_deltas(&self) -> Vec<f64> {
        let mut deltas = Vec::with_capacity(self.times.len());
        for (index, time) in self.times.iter().enumerate() {
            if index == 0 {
                deltas.push(0.0);
            } else {
                deltas.push(seconds_between(self.times[index - 1], *time));
            }
        }
        deltas
    }

    /// Convert to a polars frame: millisecond `time` column followed by every channel
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let millis: Vec<i64> = self.times.iter().map(|t| t.timestamp_millis()).collect();
        let mut frame_columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        frame_columns.push(
            Series::new(columns::TIME.into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .into(),
        );
        for channel in &self.columns {
            frame_columns
                .push(Series::new(channel.name.as_str().into(), channel.values.clone()).into());
        }
        DataFrame::new(frame_columns)
    }
}

/// Signed difference `later - earlier` in fractional seconds
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Summary statistics of a successfully transformed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub available_channels: Vec<String>,
    pub start_time: String,
    pub stop_time: String,
    /// Distance estimate per robot id, only for robots with a velocity magnitude
    #[serde(rename = "total_distance_mm")]
    pub total_distance: BTreeMap<u8, f64>,
    pub total_runtime_seconds: f64,
}

/// Outcome of one run: a table with its statistics, or the captured failure
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success { table: WideRun, stats: RunStats },
    Failure { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub run_id: RunId,
    pub outcome: RunOutcome,
}

impl RunResult {
    pub fn success(run_id: RunId, table: WideRun, stats: RunStats) -> Self {
        Self {
            run_id,
            outcome: RunOutcome::Success { table, stats },
        }
    }

    pub fn failure(run_id: RunId, error: impl Into<String>) -> Self {
        Self {
            run_id,
            outcome: RunOutcome::Failure {
                error: error.into(),
            },
        }
    }

    pub fn table(&self) -> Option<&WideRun> {
        match &self.outcome {
            RunOutcome::Success { table, .. } => Some(table),
            RunOutcome::Failure { .. } => None,
        }
    }

    pub fn stats(&self) -> Option<&RunStats> {
        match &self.outcome {
            RunOutcome::Success { stats, .. } => Some(stats),
            RunOutcome::Failure { .. } => None,
        }
    }
}

/// Anything the stats collector can classify as success or failure
pub trait Outcome {
    /// Captured failure text, `None` on success
    fn failure(&self) -> Option<&str>;
}

impl Outcome for RunResult {
    fn failure(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Success { .. } => None,
            RunOutcome::Failure { error } => Some(error),
        }
    }
}

/// Success/error tally at run or file granularity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCounts {
    pub error_count: usize,
    pub success_count: usize,
    pub total_count: usize,
}

/// Run tally stored with a harvested file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    pub run_error_count: usize,
    pub run_success_count: usize,
    pub run_total_count: usize,
}

impl From<ResultCounts> for FileStats {
    fn from(counts: ResultCounts) -> Self {
        Self {
            run_error_count: counts.error_count,
            run_success_count: counts.success_count,
            run_total_count: counts.total_count,
        }
    }
}

/// Outcome of one source file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Harvested {
        runs: BTreeMap<RunId, RunResult>,
        stats: FileStats,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileResult {
    /// Logical source name: file name without directory or extension
    pub source_file: String,
    pub outcome: FileOutcome,
}

impl FileResult {
    pub fn harvested(
        source_file: impl Into<String>,
        runs: BTreeMap<RunId, RunResult>,
        stats: FileStats,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            outcome: FileOutcome::Harvested { runs, stats },
        }
    }

    pub fn failed(source_file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            outcome: FileOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn runs(&self) -> Option<&BTreeMap<RunId, RunResult>> {
        match &self.outcome {
            FileOutcome::Harvested { runs, .. } => Some(runs),
            FileOutcome::Failed { .. } => None,
        }
    }

    pub fn stats(&self) -> Option<&FileStats> {
        match &self.outcome {
            FileOutcome::Harvested { stats, .. } => Some(stats),
            FileOutcome::Failed { .. } => None,
        }
    }
}

impl Outcome for FileResult {
    fn failure(&self) -> Option<&str> {
        match &self.outcome {
            FileOutcome::Harvested { .. } => None,
            FileOutcome::Failed { error } => Some(error),
        }
    }
}
