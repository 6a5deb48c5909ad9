//! Output module for run statistics and the end-of-run summary

pub mod stats;

pub use stats::{print_summary, HarvestStats, StatsSnapshot};
