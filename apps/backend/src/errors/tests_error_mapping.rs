// Unit tests for error mapping - pure domain logic without HTTP or database dependencies
use crate::errors::domain::{
    ConflictKind, DomainError, ForbiddenKind, InfraErrorKind, NotFoundKind, ValidationKind,
};
use crate::{AppError, ErrorCode};

#[test]
fn maps_validation_to_422() {
    let de = DomainError::validation(ValidationKind::OutOfTurn, "not your pick");
    let app: AppError = de.into();
    assert_eq!(app.code(), ErrorCode::OutOfTurn);
    assert_eq!(app.status().as_u16(), 422);

    let reused = DomainError::validation(ValidationKind::IdempotencyKeyReused, "other league");
    let app: AppError = reused.into();
    assert_eq!(app.code(), ErrorCode::IdempotencyKeyReused);
    assert_eq!(app.status().as_u16(), 422);

    let other = DomainError::validation(ValidationKind::Other("x".into()), "bad field");
    let app: AppError = other.into();
    assert_eq!(app.code(), ErrorCode::ValidationError);
}

#[test]
fn maps_conflicts() {
    let drafted = DomainError::conflict(ConflictKind::PlayerAlreadyDrafted, "taken");
    let app: AppError = drafted.into();
    assert_eq!(app.code().as_str(), "PLAYER_ALREADY_DRAFTED");
    assert_eq!(app.status().as_u16(), 409);

    let other = DomainError::conflict(ConflictKind::Other("x".to_string()), "generic conflict");
    let app: AppError = other.into();
    assert_eq!(app.code().as_str(), "CONFLICT");
    assert_eq!(app.status().as_u16(), 409);
}

#[test]
fn maps_not_found_and_forbidden() {
    let nf = DomainError::not_found(NotFoundKind::Draft, "no draft");
    let app: AppError = nf.into();
    assert_eq!(app.code().as_str(), "DRAFT_NOT_FOUND");
    assert_eq!(app.status().as_u16(), 404);

    let denied = DomainError::forbidden(ForbiddenKind::NotCommissioner, "nope");
    let app: AppError = denied.into();
    assert_eq!(app.code().as_str(), "NOT_COMMISSIONER");
    assert_eq!(app.status().as_u16(), 403);
}

#[test]
fn maps_infra() {
    let t = DomainError::infra(InfraErrorKind::Timeout, "timeout");
    let app: AppError = t.into();
    assert_eq!(app.code().as_str(), "DB_TIMEOUT");
    assert_eq!(app.status().as_u16(), 504);
    assert!(matches!(app, AppError::Timeout { .. }));

    let pool = DomainError::infra(InfraErrorKind::PoolExhausted, "busy");
    let app: AppError = pool.into();
    assert_eq!(app.code().as_str(), "DB_POOL_EXHAUSTED");
    assert_eq!(app.status().as_u16(), 503);
    assert!(app.is_retryable());

    let corrupt = DomainError::infra(InfraErrorKind::DataCorruption, "empty player pool");
    let app: AppError = corrupt.into();
    assert_eq!(app.code(), ErrorCode::DataCorruption);
    assert_eq!(app.status().as_u16(), 500);
    assert!(!app.is_retryable());
}
