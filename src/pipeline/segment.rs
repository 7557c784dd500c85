//! Run segmentation
//!
//! Partitions cleaned readings into one long-format table per run.

use crate::models::{CleanedReading, RunId, RunReading, RunTable};
use std::collections::HashMap;
use tracing::info;

/// Group cleaned readings by run id
///
/// Each distinct `run_id` integer becomes one [`RunTable`] keyed by its
/// canonical [`RunId`]; the id is dropped from the rows themselves. Tables
/// come back in order of first appearance and rows keep their input order.
pub fn separate_runs(readings: Vec<CleanedReading>) -> Vec<RunTable> {
    let mut index_by_run: HashMap<u128, usize> = HashMap::new();
    let mut tables: Vec<RunTable> = Vec::new();

    for reading in readings {
        let index = *index_by_run.entry(reading.run_id).or_insert_with(|| {
            tables.push(RunTable {
                run_id: RunId::from_u128(reading.run_id),
                readings: Vec::new(),
            });
            tables.len() - 1
        });

        tables[index].readings.push(RunReading {
            time: reading.time,
            value: reading.value,
            field: reading.field,
            robot_id: reading.robot_id,
        });
    }

    info!("Separated {} runs", tables.len());
    tables
}
