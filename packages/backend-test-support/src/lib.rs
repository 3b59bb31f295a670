//! Test-only helpers for the league backend: logging setup, Problem Details
//! assertions and unique test data.

pub mod logging;
pub mod problem_details;
pub mod unique_helpers;
