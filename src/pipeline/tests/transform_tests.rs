//! Per-run transformation tests

use super::{RUN_A, at_ms, complete_run_table, reading};
use crate::error::HarvestError;
use crate::models::{ChannelColumn, Field, RunId, RunOutcome, RunTable, WideRun};
use crate::pipeline::transform::{
    ChannelSample, RunTransformer, add_magnitude, add_scalars, append_derivatives,
    dedupe_readings, differentiate, pivot_samples, run_stats, total_distances,
};

fn sample(ms: i64, channel: &str, value: f64) -> ChannelSample {
    ChannelSample {
        time: at_ms(ms),
        channel: channel.to_string(),
        value,
    }
}

fn run_id() -> RunId {
    RunId::from_u128(RUN_A)
}

#[test]
fn test_dedupe_sorts_and_keeps_first_sample() {
    let readings = vec![
        reading(1000, Field::X, 1, 1.0),
        reading(0, Field::X, 1, 5.0),
        reading(1000, Field::X, 1, 1.0),
        reading(1000, Field::X, 2, 7.0),
    ];

    let deduped = dedupe_readings(readings, false, run_id()).unwrap();

    assert_eq!(deduped.len(), 3);
    assert_eq!(deduped[0].time, at_ms(0));
    assert_eq!(deduped[1].time, at_ms(1000));
    assert_eq!(deduped[1].robot_id, 1);
    assert_eq!(deduped[2].robot_id, 2);
}

#[test]
fn test_dedupe_without_validation_ignores_conflicts() {
    let readings = vec![
        reading(0, Field::X, 1, 1.0),
        reading(0, Field::X, 1, 2.0),
    ];

    let deduped = dedupe_readings(readings, false, run_id()).unwrap();

    assert_eq!(deduped.len(), 1);
    assert_eq!(deduped[0].value, 1.0);
}

#[test]
fn test_strict_dedupe_rejects_conflicting_values() {
    let readings = vec![
        reading(0, Field::Fx, 1, 1.0),
        reading(0, Field::Fx, 1, 2.0),
    ];

    let result = dedupe_readings(readings, true, run_id());

    match result {
        Err(HarvestError::ConflictingDuplicates { run_id, details }) => {
            assert_eq!(run_id, "00000000-0000-0000-1122-10f47de98115");
            assert!(details.contains("fx_1"));
        }
        other => panic!("Expected ConflictingDuplicates, got {:?}", other),
    }
}

#[test]
fn test_strict_dedupe_accepts_agreeing_duplicates() {
    let readings = vec![
        reading(0, Field::Fx, 1, 1.0),
        reading(0, Field::Fx, 1, 1.0),
    ];

    let deduped = dedupe_readings(readings, true, run_id()).unwrap();
    assert_eq!(deduped.len(), 1);
}

#[test]
fn test_differentiate_uses_time_deltas_in_seconds() {
    let series = vec![(at_ms(0), 0.0), (at_ms(500), 1.0), (at_ms(1500), 5.0)];

    let derivative = differentiate(&series);

    assert_eq!(derivative, vec![(at_ms(500), 2.0), (at_ms(1500), 4.0)]);
}

#[test]
fn test_nan_differences_are_dropped() {
    let series = vec![
        (at_ms(0), f64::INFINITY),
        (at_ms(1000), f64::INFINITY),
        (at_ms(2000), 4.0),
    ];

    let derivative = differentiate(&series);

    assert_eq!(derivative, vec![(at_ms(2000), f64::NEG_INFINITY)]);
}

#[test]
fn test_infinite_positions_yield_no_velocity_samples() {
    let samples = vec![
        sample(0, "x_1", f64::INFINITY),
        sample(1000, "x_1", f64::INFINITY),
    ];

    let samples = append_derivatives(samples);

    assert!(!samples.iter().any(|s| s.channel == "vx_1"));
    assert!(!samples.iter().any(|s| s.channel == "ax_1"));
    assert!(!samples.iter().any(|s| s.value.is_nan()));
    assert_eq!(samples.len(), 2);
}

#[test]
fn test_derivatives_are_shorter_than_positions() {
    let samples = vec![
        sample(0, "x_1", 0.0),
        sample(1000, "x_1", 1.0),
        sample(2000, "x_1", 4.0),
        sample(0, "fx_1", 9.0),
    ];

    let samples = append_derivatives(samples);

    let velocity: Vec<&ChannelSample> = samples.iter().filter(|s| s.channel == "vx_1").collect();
    let acceleration: Vec<&ChannelSample> =
        samples.iter().filter(|s| s.channel == "ax_1").collect();
    assert_eq!(velocity.len(), 2);
    assert_eq!(velocity[0].value, 1.0);
    assert_eq!(velocity[1].value, 3.0);
    assert_eq!(acceleration.len(), 1);
    assert_eq!(acceleration[0].time, at_ms(2000));
    assert_eq!(acceleration[0].value, 2.0);

    assert!(!samples.iter().any(|s| s.channel.starts_with("vf")));
    assert!(samples.windows(2).all(|pair| pair[0].time <= pair[1].time));
}

#[test]
fn test_pivot_forward_fills_and_drops_leading_incomplete_rows() {
    let samples = vec![
        sample(0, "x_1", 1.0),
        sample(1000, "fx_1", 10.0),
        sample(2000, "x_1", 3.0),
        sample(3000, "fx_1", 20.0),
    ];

    let table = pivot_samples(samples);

    assert_eq!(table.times, vec![at_ms(1000), at_ms(2000), at_ms(3000)]);
    assert_eq!(table.column("x_1").unwrap(), &[1.0, 3.0, 3.0]);
    assert_eq!(table.column("fx_1").unwrap(), &[10.0, 10.0, 20.0]);
}

#[test]
fn test_pivot_orders_columns_by_name() {
    let samples = vec![sample(0, "x_1", 1.0), sample(0, "fx_1", 2.0)];

    let table = pivot_samples(samples);

    assert_eq!(table.column_names(), vec!["time", "fx_1", "x_1"]);
}

#[test]
fn test_magnitude_of_three_four_zero_is_five() {
    let mut table = WideRun {
        times: vec![at_ms(0)],
        columns: vec![
            ChannelColumn {
                name: "vx_1".to_string(),
                values: vec![3.0],
            },
            ChannelColumn {
                name: "vy_1".to_string(),
                values: vec![4.0],
            },
            ChannelColumn {
                name: "vz_1".to_string(),
                values: vec![0.0],
            },
        ],
    };

    add_scalars(run_id(), &mut table);

    assert_eq!(table.column("v1").unwrap(), &[5.0]);
    assert!(!table.has_column("a1"));
    assert!(!table.has_column("v2"));
}

#[test]
fn test_magnitude_skipped_when_constituent_missing() {
    let mut table = WideRun {
        times: vec![at_ms(0)],
        columns: vec![
            ChannelColumn {
                name: "x_1".to_string(),
                values: vec![1.0],
            },
            ChannelColumn {
                name: "y_1".to_string(),
                values: vec![1.0],
            },
        ],
    };
    let needed = vec!["x_1".to_string(), "y_1".to_string(), "z_1".to_string()];

    let added = add_magnitude(run_id(), &mut table, "p_1".to_string(), &needed);

    assert!(!added);
    assert!(!table.has_column("p_1"));
    assert_eq!(table.columns.len(), 2);
}

#[test]
fn test_total_distance_sums_speed_times_delta() {
    let table = WideRun {
        times: vec![at_ms(0), at_ms(1000), at_ms(2000)],
        columns: vec![ChannelColumn {
            name: "v1".to_string(),
            values: vec![2.0, 2.0, 2.0],
        }],
    };

    let distances = total_distances(&table);

    assert_eq!(distances.get(&1), Some(&4.0));
    assert!(!distances.contains_key(&2));
}

#[test]
fn test_run_stats_on_single_row() {
    let table = WideRun {
        times: vec![at_ms(0)],
        columns: vec![ChannelColumn {
            name: "v2".to_string(),
            values: vec![7.0],
        }],
    };

    let stats = run_stats(run_id(), &table).unwrap();

    assert_eq!(stats.start_time, "2022-11-23T20:40:00.000Z");
    assert_eq!(stats.stop_time, stats.start_time);
    assert_eq!(stats.total_runtime_seconds, 0.0);
    assert_eq!(stats.total_distance.get(&2), Some(&0.0));
    assert_eq!(stats.available_channels, vec!["time", "v2"]);
}

#[test]
fn test_complete_run_transformation() {
    let transformer = RunTransformer::default();

    let (table, stats) = transformer.try_transform(complete_run_table(RUN_A)).unwrap();

    // Acceleration first exists at t = 2 s, so earlier rows are incomplete
    assert_eq!(table.times, vec![at_ms(2000), at_ms(3000)]);
    assert_eq!(table.column("x_1").unwrap(), &[4.0, 6.0]);
    assert_eq!(table.column("vx_1").unwrap(), &[2.0, 2.0]);
    assert_eq!(table.column("ax_1").unwrap(), &[0.0, 0.0]);
    assert_eq!(table.column("v1").unwrap(), &[2.0, 2.0]);
    assert_eq!(table.column("f1").unwrap(), &[5.0, 5.0]);
    assert_eq!(table.column("p_1").unwrap(), &[4.0, 6.0]);
    assert_eq!(table.column("v2").unwrap(), &[0.0, 0.0]);

    assert_eq!(stats.available_channels.len(), 33);
    assert_eq!(stats.available_channels[0], "time");
    assert_eq!(stats.start_time, "2022-11-23T20:40:02.000Z");
    assert_eq!(stats.stop_time, "2022-11-23T20:40:03.000Z");
    assert_eq!(stats.total_runtime_seconds, 1.0);
    assert_eq!(stats.total_distance.get(&1), Some(&2.0));
    assert_eq!(stats.total_distance.get(&2), Some(&0.0));
}

#[test]
fn test_transform_is_deterministic() {
    let transformer = RunTransformer::default();

    let first = transformer.transform(complete_run_table(RUN_A));
    let second = transformer.transform(complete_run_table(RUN_A));

    assert_eq!(first, second);
}

#[test]
fn test_run_without_readings_fails() {
    let run = RunTable {
        run_id: run_id(),
        readings: Vec::new(),
    };

    let result = RunTransformer::default().transform(run);

    match result.outcome {
        RunOutcome::Failure { error } => assert!(error.contains("no rows left")),
        RunOutcome::Success { .. } => panic!("Expected an empty run to fail"),
    }
}
