//! Infrastructure: pool bootstrap, state assembly and storage error mapping.

pub mod db;
pub mod db_errors;
pub mod state;
