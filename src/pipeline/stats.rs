//! Outcome statistics collection
//!
//! Counts successes and failures over a mapping of id to result, at either
//! run or file granularity, and logs every failure with its captured text.

use crate::models::{Outcome, ResultCounts};
use std::fmt::Display;
use tracing::error;

/// Tally successes and failures, logging each failing id
///
/// # Arguments
///
/// * `id_to_result` - Pairs of id and result (runs of a file, or files of a batch)
/// * `tag` - Granularity used in log lines, e.g. `"run"` or `"file"`
///
/// # Returns
///
/// Error, success and total counts
pub fn collect_outcomes<'a, K, R, I>(id_to_result: I, tag: &str) -> ResultCounts
where
    K: Display + 'a,
    R: Outcome + 'a,
    I: IntoIterator<Item = (&'a K, &'a R)>,
{
    let mut counts = ResultCounts::default();

    for (id, result) in id_to_result {
        match result.failure() {
            Some(failure) => {
                counts.error_count += 1;
                error!("Failed to process {} {}:\n{}", tag, id, failure);
            }
            None => counts.success_count += 1,
        }
    }

    counts.total_count = counts.error_count + counts.success_count;
    counts
}
