//! SeaORM -> DomainError translation helpers.
//!
//! Repositories convert `sea_orm::DbErr` into `DomainError` here, and higher
//! layers map `DomainError` to `AppError` via `From`.

use sea_orm::{ConnAcquireErr, DbErr};
use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind, ValidationKind};
use crate::trace_ctx;

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// True when the error is a unique-constraint violation on either backend.
pub fn is_unique_violation(e: &DbErr) -> bool {
    let msg = e.to_string();
    mentions_sqlstate(&msg, "23505")
        || msg.contains("duplicate key value violates unique constraint")
        || msg.contains("UNIQUE constraint failed")
}

/// Extract table.column from SQLite "UNIQUE constraint failed: table.a, table.b" messages.
fn extract_sqlite_columns(error_msg: &str) -> Option<&str> {
    let start = error_msg.find("UNIQUE constraint failed: ")? + "UNIQUE constraint failed: ".len();
    Some(error_msg[start..].lines().next().unwrap_or_default().trim())
}

fn map_unique_to_conflict(error_msg: &str) -> Option<(ConflictKind, &'static str)> {
    let sqlite_cols = extract_sqlite_columns(error_msg).unwrap_or_default();
    let hit = |pg_constraint: &str, sqlite: &str| {
        error_msg.contains(pg_constraint) || (!sqlite_cols.is_empty() && sqlite_cols == sqlite)
    };

    if hit(
        "ux_draft_picks_draft_player",
        "draft_picks.draft_id, draft_picks.player_id",
    ) {
        return Some((
            ConflictKind::PlayerAlreadyDrafted,
            "Player has already been drafted",
        ));
    }
    if hit(
        "ux_draft_picks_draft_pick_number",
        "draft_picks.draft_id, draft_picks.pick_number",
    ) {
        return Some((
            ConflictKind::PickAlreadyMade,
            "A pick already exists for this slot",
        ));
    }
    if hit(
        "ux_draft_queue_draft_roster_player",
        "draft_queue.draft_id, draft_queue.roster_id, draft_queue.player_id",
    ) {
        return Some((ConflictKind::AlreadyQueued, "Player is already queued"));
    }
    None
}

/// Translate a `DbErr` into a `DomainError` with sanitized detail.
pub fn map_db_err(e: DbErr) -> DomainError {
    let error_msg = e.to_string();
    let trace_id = trace_ctx::trace_id();

    match &e {
        DbErr::RecordNotFound(_) => {
            return DomainError::not_found(NotFoundKind::Other("Record".into()), "Record not found");
        }
        DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => {
            warn!(trace_id = %trace_id, "Connection pool exhausted");
            return DomainError::infra(
                InfraErrorKind::PoolExhausted,
                "Database connection pool exhausted; retry shortly",
            );
        }
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => {
            warn!(trace_id = %trace_id, raw_error = %error_msg, "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    if is_unique_violation(&e) {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Unique constraint violation");
        if let Some((kind, detail)) = map_unique_to_conflict(&error_msg) {
            return DomainError::conflict(kind, detail);
        }
        return DomainError::conflict(ConflictKind::UniqueViolation, "Unique constraint violation");
    }

    if mentions_sqlstate(&error_msg, "23503") || error_msg.contains("FOREIGN KEY constraint failed")
    {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Foreign key constraint violation");
        return DomainError::validation(
            ValidationKind::Other("FK".into()),
            "Foreign key constraint violation",
        );
    }

    if error_msg.contains("timeout") || error_msg.contains("timed out") {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Database timeout");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(trace_id = %trace_id, raw_error = %error_msg, "Unhandled database error");
    DomainError::infra(InfraErrorKind::Other("DbErr".into()), "Database operation failed")
}

impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        map_db_err(e)
    }
}
