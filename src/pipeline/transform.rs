//! Per-run transformation
//!
//! Takes one run's long-format readings and produces the wide, forward-filled
//! table with derived velocity, acceleration and magnitude channels, plus the
//! run statistics. The transformation is a pure function of the run's own
//! readings and the fixed robot/axis constants, so runs can be processed
//! independently on any worker.
//!
//! Steps, in order:
//!
//! 1. Temporal dedupe (optionally verifying duplicate values agree)
//! 2. Channel naming (`{field}_{robot}`)
//! 3. Derivative synthesis (`v{axis}_{robot}`, `a{axis}_{robot}`)
//! 4. Pivot to wide format with forward-fill hold
//! 5. Scalar magnitudes (`v1`, `a1`, `f1`, `p_1`, ...)
//! 6. Run statistics

use crate::config::HarvestConfig;
use crate::constants::{
    ACCELERATION_PREFIX, AXES, MAGNITUDE_MEASURES, POSITION_MAGNITUDE_PREFIX, ROBOT_IDS,
    STATS_TIME_FORMAT, VELOCITY_PREFIX,
};
use crate::error::{HarvestError, Result, error_report};
use crate::models::{
    ChannelColumn, Field, RunId, RunReading, RunResult, RunStats, RunTable, WideRun,
    channel_name, seconds_between,
};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// One long-format sample after channel naming
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSample {
    pub time: DateTime<Utc>,
    pub channel: String,
    pub value: f64,
}

/// Run transformer carrying the only per-run knob: strict duplicate validation
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTransformer {
    validate_duplicates: bool,
}

impl RunTransformer {
    pub fn new(validate_duplicates: bool) -> Self {
        Self {
            validate_duplicates,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.validate_duplicates)
    }

    /// Transform one run, capturing any failure as an error result
    pub fn transform(&self, run: RunTable) -> RunResult {
        let run_id = run.run_id;
        info!("Processing run {} ({} readings)", run_id, run.readings.len());

        match self.try_transform(run) {
            Ok((table, stats)) => RunResult::success(run_id, table, stats),
            Err(error) => RunResult::failure(run_id, error_report(&error)),
        }
    }

    /// Transform one run, propagating the first failure
    pub fn try_transform(&self, run: RunTable) -> Result<(WideRun, RunStats)> {
        let RunTable { run_id, readings } = run;

        let readings = dedupe_readings(readings, self.validate_duplicates, run_id)?;
        let samples = name_channels(readings);
        let samples = append_derivatives(samples);
        let mut table = pivot_samples(samples);
        if table.height() == 0 {
            return Err(HarvestError::EmptyRun {
                run_id: run_id.to_string(),
            });
        }

        add_scalars(run_id, &mut table);
        let stats = run_stats(run_id, &table)?;

        debug!(
            "Run {} transformed: {} rows x {} channels",
            run_id,
            table.height(),
            table.columns.len()
        );
        Ok((table, stats))
    }
}

/// Sort a run by time and drop repeated `(time, field, robot_id)` samples
///
/// Sorting is stable, so the first sample of each key in input order wins.
/// With `validate` set, any key whose samples carry different values fails
/// the run instead.
pub fn dedupe_readings(
    mut readings: Vec<RunReading>,
    validate: bool,
    run_id: RunId,
) -> Result<Vec<RunReading>> {
    readings.sort_by_key(|reading| reading.time);

    if validate {
        check_duplicate_values(&readings, run_id)?;
    }

    let mut seen: HashSet<(DateTime<Utc>, Field, u8)> = HashSet::new();
    readings.retain(|reading| seen.insert((reading.time, reading.field, reading.robot_id)));
    Ok(readings)
}

fn check_duplicate_values(readings: &[RunReading], run_id: RunId) -> Result<()> {
    let mut first_values: HashMap<(DateTime<Utc>, Field, u8), f64> = HashMap::new();

    for reading in readings {
        match first_values.entry((reading.time, reading.field, reading.robot_id)) {
            Entry::Occupied(entry) => {
                if *entry.get() != reading.value {
                    return Err(HarvestError::ConflictingDuplicates {
                        run_id: run_id.to_string(),
                        details: format!(
                            "{} at {} has values {} and {}",
                            channel_name(reading.field.as_str(), reading.robot_id),
                            reading.time.format(STATS_TIME_FORMAT),
                            entry.get(),
                            reading.value
                        ),
                    });
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(reading.value);
            }
        }
    }
    Ok(())
}

/// Combine field and robot into the channel key
pub fn name_channels(readings: Vec<RunReading>) -> Vec<ChannelSample> {
    readings
        .into_iter()
        .map(|reading| ChannelSample {
            time: reading.time,
            channel: channel_name(reading.field.as_str(), reading.robot_id),
            value: reading.value,
        })
        .collect()
}

/// Append velocity and acceleration channels for every position channel
///
/// Each derivative is the consecutive difference divided by the time delta
/// in seconds; the first sample has no predecessor and is dropped, so a
/// velocity series is one sample shorter than its position series and an
/// acceleration series two shorter. The result is re-sorted by time.
pub fn append_derivatives(mut samples: Vec<ChannelSample>) -> Vec<ChannelSample> {
    let mut derived = Vec::new();

    for robot in ROBOT_IDS {
        for axis in AXES {
            let position_channel = channel_name(axis, robot);
            let position: Vec<(DateTime<Utc>, f64)> = samples
                .iter()
                .filter(|sample| sample.channel == position_channel)
                .map(|sample| (sample.time, sample.value))
                .collect();

            let velocity = differentiate(&position);
            let acceleration = differentiate(&velocity);

            let velocity_channel = format!("{}{}", VELOCITY_PREFIX, position_channel);
            let acceleration_channel = format!("{}{}", ACCELERATION_PREFIX, position_channel);
            derived.extend(to_samples(&velocity_channel, velocity));
            derived.extend(to_samples(&acceleration_channel, acceleration));
        }
    }

    samples.extend(derived);
    samples.sort_by_key(|sample| sample.time);
    samples
}

/// Finite-difference derivative of a time-sorted series
///
/// Differences that come out NaN (e.g. between two infinite samples) are
/// dropped like the leading sample.
pub fn differentiate(series: &[(DateTime<Utc>, f64)]) -> Vec<(DateTime<Utc>, f64)> {
    series
        .windows(2)
        .map(|pair| {
            let (previous_time, previous_value) = pair[0];
            let (time, value) = pair[1];
            let delta = seconds_between(previous_time, time);
            (time, (value - previous_value) / delta)
        })
        .filter(|(_, derivative)| !derivative.is_nan())
        .collect()
}

fn to_samples(channel: &str, series: Vec<(DateTime<Utc>, f64)>) -> Vec<ChannelSample> {
    series
        .into_iter()
        .map(|(time, value)| ChannelSample {
            time,
            channel: channel.to_string(),
            value,
        })
        .collect()
}

/// Reshape long samples into a wide table with forward-fill hold
///
/// Columns are ordered by channel name. Every column holds its last known
/// value until a newer sample arrives; rows before every column has been
/// filled at least once are dropped.
pub fn pivot_samples(samples: Vec<ChannelSample>) -> WideRun {
    let mut times: Vec<DateTime<Utc>> = samples.iter().map(|sample| sample.time).collect();
    times.sort();
    times.dedup();

    let row_of: HashMap<DateTime<Utc>, usize> = times
        .iter()
        .enumerate()
        .map(|(row, time)| (*time, row))
        .collect();

    let mut grid: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for sample in samples {
        if let Some(&row) = row_of.get(&sample.time) {
            grid.entry(sample.channel)
                .or_insert_with(|| vec![None; times.len()])[row] = Some(sample.value);
        }
    }

    for values in grid.values_mut() {
        let mut held = None;
        for value in values.iter_mut() {
            if value.is_some() {
                held = *value;
            } else {
                *value = held;
            }
        }
    }

    let first_complete = (0..times.len())
        .find(|&row| grid.values().all(|values| values[row].is_some()))
        .unwrap_or(times.len());

    WideRun {
        times: times.split_off(first_complete),
        columns: grid
            .into_iter()
            .map(|(name, values)| ChannelColumn {
                name,
                values: values.into_iter().skip(first_complete).flatten().collect(),
            })
            .collect(),
    }
}

/// Add Euclidean magnitude columns for each robot
///
/// Velocity, acceleration and force get `{measure}{robot}`; position gets
/// `p_{robot}`. A magnitude is only added when all three axis channels
/// exist; otherwise a warning names the missing set.
pub fn add_scalars(run_id: RunId, table: &mut WideRun) {
    for robot in ROBOT_IDS {
        for measure in MAGNITUDE_MEASURES {
            let needed: Vec<String> = AXES
                .iter()
                .map(|axis| channel_name(&format!("{}{}", measure, axis), robot))
                .collect();
            add_magnitude(run_id, table, format!("{}{}", measure, robot), &needed);
        }

        let needed: Vec<String> = AXES.iter().map(|axis| channel_name(axis, robot)).collect();
        add_magnitude(
            run_id,
            table,
            format!("{}{}", POSITION_MAGNITUDE_PREFIX, robot),
            &needed,
        );
    }
}

/// Add one magnitude column, returning whether it was created
pub fn add_magnitude(run_id: RunId, table: &mut WideRun, name: String, needed: &[String]) -> bool {
    let present: Vec<&[f64]> = needed
        .iter()
        .filter_map(|channel| table.column(channel))
        .collect();

    if present.len() != needed.len() {
        let have: Vec<&String> = needed
            .iter()
            .filter(|channel| table.has_column(channel))
            .collect();
        warn!(
            "Run {} missing channels for {}: {:?} vs {:?}",
            run_id, name, needed, have
        );
        return false;
    }

    let values: Vec<f64> = (0..table.height())
        .map(|row| {
            present
                .iter()
                .map(|column| column[row] * column[row])
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    table.columns.push(ChannelColumn { name, values });
    true
}

/// Distance per robot: sum of velocity magnitude times the time delta
///
/// The first row's delta is 0. Robots without a velocity magnitude column
/// are absent from the map.
pub fn total_distances(table: &WideRun) -> BTreeMap<u8, f64> {
    let deltas = table.time_deltas();
    ROBOT_IDS
        .iter()
        .filter_map(|&robot| {
            let velocity = table.column(&format!("{}{}", VELOCITY_PREFIX, robot))?;
            let distance = velocity
                .iter()
                .zip(&deltas)
                .map(|(speed, delta)| speed * delta)
                .sum();
            Some((robot, distance))
        })
        .collect()
}

/// Summary statistics of a transformed run
pub fn run_stats(run_id: RunId, table: &WideRun) -> Result<RunStats> {
    let (Some(&start), Some(&stop)) = (table.times.first(), table.times.last()) else {
        return Err(HarvestError::EmptyRun {
            run_id: run_id.to_string(),
        });
    };

    Ok(RunStats {
        available_channels: table.column_names(),
        start_time: start.format(STATS_TIME_FORMAT).to_string(),
        stop_time: stop.format(STATS_TIME_FORMAT).to_string(),
        total_distance: total_distances(table),
        total_runtime_seconds: seconds_between(start, stop),
    })
}
