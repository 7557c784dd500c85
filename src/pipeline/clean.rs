//! Raw reading validation and cleaning
//!
//! Turns the collector's loosely typed rows into trustworthy readings.
//! Malformed rows never raise: they are excluded and only the removed-row
//! count is reported.

use crate::constants::{RAW_TIME_FORMAT, ROBOT_IDS};
use crate::models::{CleanedReading, Field, RawReading, SensorType};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::info;

/// Result of cleaning one source file's readings
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningOutcome {
    /// Readings that passed every check
    pub readings: Vec<CleanedReading>,
    /// Number of raw rows excluded
    pub removed: usize,
}

/// Validate and convert raw readings
///
/// A row survives only if its time parses, its value is numeric (not NaN),
/// it carries a run id, its field is one of `x y z fx fy fz`, its robot id is
/// 1 or 2, and its sensor type matches the field prefix (`f*` is a load
/// cell, everything else an encoder).
///
/// # Arguments
///
/// * `raw` - Rows read from one source file
///
/// # Returns
///
/// The surviving readings in input order plus the removed-row count
pub fn clean_readings(raw: Vec<RawReading>) -> CleaningOutcome {
    let input_rows = raw.len();
    info!("Cleaning {} raw rows", input_rows);

    let readings: Vec<CleanedReading> = raw.into_iter().filter_map(clean_reading).collect();

    let removed = input_rows - readings.len();
    info!("Removed {} invalid rows, {} remain", removed, readings.len());

    CleaningOutcome { readings, removed }
}

/// Validate a single row, `None` when any check fails
pub fn clean_reading(raw: RawReading) -> Option<CleanedReading> {
    let time = parse_time(raw.time.as_deref()?)?;
    let value = parse_value(raw.value.as_deref()?)?;
    let run_id = raw.run_id?;
    let field = Field::parse(raw.field.as_deref()?)?;
    let robot_id = parse_robot_id(raw.robot_id?)?;
    let sensor_type = SensorType::parse(raw.sensor_type.as_deref()?)?;

    if field.sensor_type() != sensor_type {
        return None;
    }

    Some(CleanedReading {
        time,
        value,
        run_id,
        field,
        robot_id,
    })
}

/// Parse a collector timestamp such as `2022-11-23T20:40:00.005Z` as UTC
///
/// The fraction must be present with exactly three digits.
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim_end_matches('Z');
    let (_, fraction) = text.rsplit_once('.')?;
    if fraction.len() != 3 || !fraction.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    NaiveDateTime::parse_from_str(text, RAW_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Numeric coercion of a raw value; NaN counts as missing
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| !value.is_nan())
}

fn parse_robot_id(raw: i64) -> Option<u8> {
    ROBOT_IDS.iter().copied().find(|&robot| i64::from(robot) == raw)
}
