//! Source file reading and discovery
//!
//! Reads the collector's long-format Parquet files into [`RawReading`] rows.
//! Every column is read through a text cast, so string, integer and float
//! encodings of the same field all land in the same shape; values that do
//! not fit are left as `None` for the cleaner to drop.

use crate::constants::columns;
use crate::error::{HarvestError, Result};
use crate::models::RawReading;
use polars::prelude::{DataFrame, DataType, ParquetReader, SerReader};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Logical name of a source file: file name without directory or extension
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// List the regular files of a data directory, sorted lexicographically
pub fn list_source_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    debug!("Found {} source files in {}", files.len(), data_dir.display());
    Ok(files)
}

/// Read one source Parquet file into raw readings
pub fn read_source_file(path: &Path) -> Result<Vec<RawReading>> {
    let file = File::open(path)?;
    let df = ParquetReader::new(file).finish()?;
    debug!("Read {} rows from {}", df.height(), path.display());
    raw_readings_from_frame(&df, path)
}

/// Extract raw readings from an in-memory frame
///
/// `path` is only used to label errors. A missing required column fails the
/// whole file; the run id column may also be named `run_uuid`.
pub fn raw_readings_from_frame(df: &DataFrame, path: &Path) -> Result<Vec<RawReading>> {
    let mut times = text_values(df, &[columns::TIME], path)?;
    let mut values = text_values(df, &[columns::VALUE], path)?;
    let run_ids = text_values(df, &[columns::RUN_ID, columns::RUN_ID_LEGACY], path)?;
    let mut fields = text_values(df, &[columns::FIELD], path)?;
    let robot_ids = text_values(df, &[columns::ROBOT_ID], path)?;
    let mut sensor_types = text_values(df, &[columns::SENSOR_TYPE], path)?;

    let readings = (0..df.height())
        .map(|row| RawReading {
            time: times[row].take(),
            value: values[row].take(),
            run_id: run_ids[row].as_deref().and_then(parse_run_id),
            field: fields[row].take(),
            robot_id: robot_ids[row].as_deref().and_then(parse_integer),
            sensor_type: sensor_types[row].take(),
        })
        .collect();

    Ok(readings)
}

/// Column values rendered as text, trying each candidate column name in turn
fn text_values(df: &DataFrame, names: &[&str], path: &Path) -> Result<Vec<Option<String>>> {
    let column = names
        .iter()
        .find_map(|name| df.column(name).ok())
        .ok_or_else(|| HarvestError::MissingColumn {
            path: path.to_path_buf(),
            column: names[0].to_string(),
        })?;

    let as_text = column.cast(&DataType::String)?;
    let values = as_text
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

/// Parse a 128-bit run id from its integer (or integral float) rendering
pub fn parse_run_id(raw: &str) -> Option<u128> {
    let raw = raw.trim();
    raw.parse::<u128>().ok().or_else(|| {
        let value = raw.parse::<f64>().ok()?;
        (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as u128)
    })
}

/// Parse an integer from its integer (or integral float) rendering
pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        let value = raw.parse::<f64>().ok()?;
        (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
    })
}
