//! Tests for source reading and cache persistence
//!
//! Fixtures write collector-style Parquet files from raw rows.

pub mod audit_tests;

use crate::models::RawReading;
use polars::prelude::{Column, DataFrame, NamedFrom, ParquetWriter, Series};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Collector-shaped frame: string time/field/sensor, float value, integer ids
pub fn source_frame(rows: &[RawReading]) -> DataFrame {
    let times: Vec<Option<&str>> = rows.iter().map(|r| r.time.as_deref()).collect();
    let values: Vec<Option<f64>> = rows
        .iter()
        .map(|r| r.value.as_deref().and_then(|v| v.parse::<f64>().ok()))
        .collect();
    let run_ids: Vec<Option<u64>> = rows.iter().map(|r| r.run_id.map(|id| id as u64)).collect();
    let fields: Vec<Option<&str>> = rows.iter().map(|r| r.field.as_deref()).collect();
    let robot_ids: Vec<Option<i64>> = rows.iter().map(|r| r.robot_id).collect();
    let sensors: Vec<Option<&str>> = rows.iter().map(|r| r.sensor_type.as_deref()).collect();

    let columns: Vec<Column> = vec![
        Series::new("time".into(), times).into(),
        Series::new("value".into(), values).into(),
        Series::new("run_id".into(), run_ids).into(),
        Series::new("field".into(), fields).into(),
        Series::new("robot_id".into(), robot_ids).into(),
        Series::new("sensor_type".into(), sensors).into(),
    ];
    DataFrame::new(columns).unwrap()
}

pub fn write_frame(dir: &Path, file_name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(file_name);
    let file = File::create(&path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();
    path
}

/// Write raw rows as a collector Parquet file
pub fn write_source_file(dir: &Path, file_name: &str, rows: &[RawReading]) -> PathBuf {
    let mut df = source_frame(rows);
    write_frame(dir, file_name, &mut df)
}
