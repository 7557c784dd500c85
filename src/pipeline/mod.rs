//! Harvesting pipeline.
//!
//! Cleans raw readings, separates them into runs, transforms each run on a
//! bounded worker pool and tallies the outcomes per file and per batch.

pub mod clean;
pub mod harvester;
pub mod scheduler;
pub mod segment;
pub mod stats;
pub mod transform;

#[cfg(test)]
pub mod tests;

pub use self::harvester::{BatchSummary, FileHarvester};
pub use self::scheduler::RunScheduler;
pub use self::transform::RunTransformer;
