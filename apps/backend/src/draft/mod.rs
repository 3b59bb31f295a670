pub mod engine;
pub mod order;
pub mod ticker;

pub use engine::{autopick_key, DraftEngine, DraftSnapshot, TickOutcome};
pub use order::{PickOrderStrategy, PickSlot};
