pub mod seasons;

pub use seasons::{Rollover, RolloverResult, SeasonService};
