//! Repository functions for the domain layer.
//!
//! Free async functions generic over `ConnectionTrait`, so they run equally on
//! a pooled connection (stale reads) or inside a `TxnRunner` transaction.

pub mod draft_order;
pub mod draft_picks;
pub mod draft_queue;
pub mod drafts;
pub mod leagues;
pub mod players;
pub mod rosters;
