//! Error codes for the league backend API.
//!
//! This module defines all error codes used throughout the application.
//! Add new codes here; never pass ad-hoc strings as error codes.
//!
//! All error codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings
//! that appear in HTTP responses.

use core::fmt;

/// Centralized error codes for the league backend API.
///
/// Each variant maps to a canonical SCREAMING_SNAKE_CASE string that appears
/// in HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Authentication & Authorization
    /// Authentication required
    Unauthorized,
    /// Missing or malformed Bearer token
    UnauthorizedMissingBearer,
    /// Invalid JWT token
    UnauthorizedInvalidJwt,
    /// JWT token has expired
    UnauthorizedExpiredJwt,
    /// Access denied
    Forbidden,
    /// Caller is not the league commissioner
    NotCommissioner,
    /// Caller does not own a roster in this draft
    NotARosterOwner,

    // Request Validation
    /// Invalid path id
    InvalidId,
    /// Out of turn
    OutOfTurn,
    /// Draft is not in a state that allows the operation
    InvalidDraftState,
    /// Draft has no order entries
    EmptyDraftOrder,
    /// General validation error
    ValidationError,
    /// General bad request error
    BadRequest,
    /// Invalid or missing HTTP header
    InvalidHeader,
    /// Malformed or oversized idempotency key
    InvalidIdempotencyKey,
    /// Precondition required for this operation
    PreconditionRequired,

    // Resource Not Found
    /// League not found
    LeagueNotFound,
    /// Draft not found
    DraftNotFound,
    /// Roster not found
    RosterNotFound,
    /// Player not found
    PlayerNotFound,
    /// General not found error
    NotFound,

    // Business Logic Conflicts
    /// Player already drafted in this draft
    PlayerAlreadyDrafted,
    /// Pick already recorded for the current slot
    PickAlreadyMade,
    /// Player already queued for this roster
    AlreadyQueued,
    /// A draft for the current season is still running
    DraftInProgress,
    /// Another request with the same idempotency key is still running
    IdempotencyInProgress,
    /// Idempotency key reused for a different request
    IdempotencyKeyReused,
    /// Optimistic lock conflict
    OptimisticLock,
    /// Generic conflict (fallback for unmatched conflicts)
    Conflict,

    // System Errors
    /// Database error
    DbError,
    /// Database unavailable
    DbUnavailable,
    /// Database pool exhausted
    DbPoolExhausted,
    /// Database timeout (gateway timeout)
    DbTimeout,

    // Database Constraint Violations
    /// Unique constraint violation (SQLSTATE 23505; generic 409)
    UniqueViolation,
    /// Foreign key constraint violation (SQLSTATE 23503; generic 409)
    FkViolation,
    /// Record not found (generic 404 for DB-driven not-found)
    RecordNotFound,

    /// Internal server error
    Internal,
    /// Configuration error
    ConfigError,
    /// Data corruption detected
    DataCorruption,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    ///
    /// This is the exact string that appears in HTTP responses.
    pub const fn as_str(&self) -> &'static str {
        match self {
            // Authentication & Authorization
            Self::Unauthorized => "UNAUTHORIZED",
            Self::UnauthorizedMissingBearer => "UNAUTHORIZED_MISSING_BEARER",
            Self::UnauthorizedInvalidJwt => "UNAUTHORIZED_INVALID_JWT",
            Self::UnauthorizedExpiredJwt => "UNAUTHORIZED_EXPIRED_JWT",
            Self::Forbidden => "FORBIDDEN",
            Self::NotCommissioner => "NOT_COMMISSIONER",
            Self::NotARosterOwner => "NOT_A_ROSTER_OWNER",

            // Request Validation
            Self::InvalidId => "INVALID_ID",
            Self::OutOfTurn => "OUT_OF_TURN",
            Self::InvalidDraftState => "INVALID_DRAFT_STATE",
            Self::EmptyDraftOrder => "EMPTY_DRAFT_ORDER",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::InvalidHeader => "INVALID_HEADER",
            Self::InvalidIdempotencyKey => "INVALID_IDEMPOTENCY_KEY",
            Self::PreconditionRequired => "PRECONDITION_REQUIRED",

            // Resource Not Found
            Self::LeagueNotFound => "LEAGUE_NOT_FOUND",
            Self::DraftNotFound => "DRAFT_NOT_FOUND",
            Self::RosterNotFound => "ROSTER_NOT_FOUND",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            // Business Logic Conflicts
            Self::PlayerAlreadyDrafted => "PLAYER_ALREADY_DRAFTED",
            Self::PickAlreadyMade => "PICK_ALREADY_MADE",
            Self::AlreadyQueued => "ALREADY_QUEUED",
            Self::DraftInProgress => "DRAFT_IN_PROGRESS",
            Self::IdempotencyInProgress => "IDEMPOTENCY_IN_PROGRESS",
            Self::IdempotencyKeyReused => "IDEMPOTENCY_KEY_REUSED",
            Self::OptimisticLock => "OPTIMISTIC_LOCK",
            Self::Conflict => "CONFLICT",

            // System Errors
            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
            Self::DbPoolExhausted => "DB_POOL_EXHAUSTED",
            Self::DbTimeout => "DB_TIMEOUT",

            // Database Constraint Violations
            Self::UniqueViolation => "UNIQUE_VIOLATION",
            Self::FkViolation => "FK_VIOLATION",
            Self::RecordNotFound => "RECORD_NOT_FOUND",

            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
            Self::DataCorruption => "DATA_CORRUPTION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
