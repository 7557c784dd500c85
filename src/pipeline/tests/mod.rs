//! Tests for the harvesting pipeline
//!
//! Shared fixtures build raw rows and run readings around a fixed base time.

pub mod transform_tests;

use crate::constants::STATS_TIME_FORMAT;
use crate::models::{Field, RawReading, RunId, RunReading, RunTable};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub const RUN_A: u128 = 1234567890123456789;
pub const RUN_B: u128 = 9876543210987654321;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 11, 23, 20, 40, 0).unwrap()
}

pub fn at_ms(ms: i64) -> DateTime<Utc> {
    base_time() + Duration::milliseconds(ms)
}

/// Collector rendering of a timestamp, e.g. `2022-11-23T20:40:00.005Z`
pub fn time_text(ms: i64) -> String {
    at_ms(ms).format(STATS_TIME_FORMAT).to_string()
}

/// A valid raw row; the sensor type follows the field prefix
pub fn raw_row(ms: i64, value: f64, run_id: u128, field: &str, robot_id: i64) -> RawReading {
    let sensor_type = if field.starts_with('f') {
        "load_cell"
    } else {
        "encoder"
    };
    RawReading {
        time: Some(time_text(ms)),
        value: Some(value.to_string()),
        run_id: Some(run_id),
        field: Some(field.to_string()),
        robot_id: Some(robot_id),
        sensor_type: Some(sensor_type.to_string()),
    }
}

pub fn reading(ms: i64, field: Field, robot_id: u8, value: f64) -> RunReading {
    RunReading {
        time: at_ms(ms),
        value,
        field,
        robot_id,
    }
}

/// Raw rows of a run sampled every second for four seconds on both robots
///
/// Robot 1 moves along x at 2 units/s with a constant (3, 4, 0) force; robot
/// 2 stands still with no force.
pub fn complete_run_rows(run_id: u128) -> Vec<RawReading> {
    let mut rows = Vec::new();
    for step in 0..4i64 {
        let ms = step * 1000;
        let x = 2.0 * step as f64;
        rows.push(raw_row(ms, x, run_id, "x", 1));
        rows.push(raw_row(ms, 0.0, run_id, "y", 1));
        rows.push(raw_row(ms, 0.0, run_id, "z", 1));
        rows.push(raw_row(ms, 3.0, run_id, "fx", 1));
        rows.push(raw_row(ms, 4.0, run_id, "fy", 1));
        rows.push(raw_row(ms, 0.0, run_id, "fz", 1));
        for field in ["x", "y", "z", "fx", "fy", "fz"] {
            rows.push(raw_row(ms, 0.0, run_id, field, 2));
        }
    }
    rows
}

/// The same run as [`complete_run_rows`], already segmented
pub fn complete_run_table(run_id: u128) -> RunTable {
    let readings = complete_run_rows(run_id)
        .into_iter()
        .filter_map(crate::pipeline::clean::clean_reading)
        .map(|cleaned| RunReading {
            time: cleaned.time,
            value: cleaned.value,
            field: cleaned.field,
            robot_id: cleaned.robot_id,
        })
        .collect();
    RunTable {
        run_id: RunId::from_u128(run_id),
        readings,
    }
}
