//! rgscan command-line application
//!
//! - `cli`: argument definitions
//! - `settings`: preset, environment and flag layering into a scan `Config`
//! - `report`: human-readable and tab-separated output

pub mod cli;
pub mod report;
pub mod settings;

/// Exit status when every job produced results
pub const EXIT_OK: i32 = 0;

/// Exit status for invalid configuration or input
pub const EXIT_CONFIG: i32 = 1;

/// Exit status when at least one job failed entirely
pub const EXIT_JOB_FAILED: i32 = 2;
