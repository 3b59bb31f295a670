//! Builders shared by unit and integration tests.
//!
//! Every state gets its own in-memory SQLite database, so tests never share
//! rows and need no cleanup.

pub mod app_builder;
pub mod fixtures;
pub mod state_builder;

pub use app_builder::create_test_app;
pub use fixtures::{seed_league, LeagueFixture, LeagueSeed};
pub use state_builder::{bearer_for, test_state, test_state_with_events, TEST_JWT_SECRET};
