//! Application constants for the telemetry harvester
//!
//! This module contains the fixed robot/axis/field sets, the raw time format,
//! source column names, cache layout names and CLI defaults.

// =============================================================================
// Robots, Axes and Fields
// =============================================================================

/// Robot identifiers present in the telemetry
pub const ROBOT_IDS: [u8; 2] = [1, 2];

/// Cartesian axes recorded by the position encoders
pub const AXES: [&str; 3] = ["x", "y", "z"];

/// Measures that get a Euclidean magnitude column: velocity, acceleration, force
pub const MAGNITUDE_MEASURES: [&str; 3] = ["v", "a", "f"];

/// Prefix of the derived velocity channels
pub const VELOCITY_PREFIX: &str = "v";

/// Prefix of the derived acceleration channels
pub const ACCELERATION_PREFIX: &str = "a";

/// Prefix of the position magnitude channel (`p_1`, `p_2`)
pub const POSITION_MAGNITUDE_PREFIX: &str = "p_";

/// Sensor type names as written by the upstream collector
pub mod sensor_types {
    /// Position encoder (fields x, y, z)
    pub const ENCODER: &str = "encoder";

    /// Load cell force sensor (fields fx, fy, fz)
    pub const LOAD_CELL: &str = "load_cell";
}

// =============================================================================
// Time Handling
// =============================================================================

/// Raw timestamp format, parsed after the trailing `Z` is stripped
pub const RAW_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Millisecond-precision UTC format used for run statistics
pub const STATS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// =============================================================================
// Source Columns
// =============================================================================

pub mod columns {
    pub const TIME: &str = "time";
    pub const VALUE: &str = "value";
    pub const RUN_ID: &str = "run_id";
    /// Legacy name of the run identifier column
    pub const RUN_ID_LEGACY: &str = "run_uuid";
    pub const FIELD: &str = "field";
    pub const ROBOT_ID: &str = "robot_id";
    pub const SENSOR_TYPE: &str = "sensor_type";
}

// =============================================================================
// Cache Layout
// =============================================================================

/// Manifest file written per harvested source file
pub const RECORD_FILE_NAME: &str = "record.json";

/// Prefix of the per-run Parquet files (`run_<RunId>.parquet`)
pub const RUN_FILE_PREFIX: &str = "run_";

/// Extension of the per-run table files
pub const RUN_FILE_EXTENSION: &str = "parquet";

/// Default audit store file name inside the cache directory
pub const AUDIT_FILE_NAME: &str = "audit.json";

// =============================================================================
// CLI Defaults
// =============================================================================

/// Default directory holding the raw source files
pub const DEFAULT_DATA_DIR: &str = "../data";

/// Default directory receiving harvested records
pub const DEFAULT_CACHE_DIR: &str = "../cache";
