//! Use-case level idempotency records.
//!
//! Called from inside a [`TxnRunner`](crate::db::TxnRunner) closure that
//! already holds the lock for the scoped entity. `find_by_key` must be the
//! first read in the closure so a retried use case returns the stored result
//! before doing any work.

use std::fmt;

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use crate::entities::operation_records;
use crate::errors::domain::{DomainError, InfraErrorKind, ValidationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    SeasonRollover,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::SeasonRollover => "season_rollover",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationScope {
    pub kind: OperationKind,
    pub league_id: Option<i64>,
}

impl OperationScope {
    pub fn league(kind: OperationKind, league_id: i64) -> Self {
        Self {
            kind,
            league_id: Some(league_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: i64,
    pub kind: OperationKind,
    pub league_id: Option<i64>,
    pub response: Value,
    pub created_at: OffsetDateTime,
}

impl Operation {
    fn from_model(kind: OperationKind, m: operation_records::Model) -> Self {
        Self {
            id: m.id,
            kind,
            league_id: m.league_id,
            response: m.response,
            created_at: m.created_at,
        }
    }
}

/// Stored result for `key`, if this user already ran the operation.
///
/// A key belongs to `(key, user, kind)`. Presenting it again for a different
/// league is a reuse error, not a miss, so the use case never runs twice
/// under one key.
pub async fn find_by_key<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    scope: OperationScope,
    user_id: i64,
    key: &str,
) -> Result<Option<Operation>, DomainError> {
    let row = select_by_key(conn, scope.kind, user_id, key).await?;
    row.map(|m| in_scope(scope, key, m)).transpose()
}

async fn select_by_key<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    kind: OperationKind,
    user_id: i64,
    key: &str,
) -> Result<Option<operation_records::Model>, DomainError> {
    Ok(operation_records::Entity::find()
        .filter(operation_records::Column::IdempotencyKey.eq(key))
        .filter(operation_records::Column::UserId.eq(user_id))
        .filter(operation_records::Column::OperationKind.eq(kind.as_str()))
        .one(conn)
        .await?)
}

fn in_scope(
    scope: OperationScope,
    key: &str,
    m: operation_records::Model,
) -> Result<Operation, DomainError> {
    if m.league_id != scope.league_id {
        return Err(DomainError::validation(
            ValidationKind::IdempotencyKeyReused,
            format!("idempotency key {key} was already used for another {}", scope.kind),
        ));
    }
    Ok(Operation::from_model(scope.kind, m))
}

/// Store `response` for `key`. When another writer got there first, its row
/// is returned unchanged.
pub async fn create<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    scope: OperationScope,
    user_id: i64,
    key: &str,
    response: Value,
    ttl: Duration,
) -> Result<Operation, DomainError> {
    let now = OffsetDateTime::now_utc();
    let row = operation_records::ActiveModel {
        id: NotSet,
        idempotency_key: Set(key.to_string()),
        user_id: Set(user_id),
        operation_kind: Set(scope.kind.as_str().to_string()),
        league_id: Set(scope.league_id),
        response: Set(response),
        created_at: Set(now),
        expires_at: Set(now + ttl),
    };

    operation_records::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                operation_records::Column::IdempotencyKey,
                operation_records::Column::UserId,
                operation_records::Column::OperationKind,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    let stored = select_by_key(conn, scope.kind, user_id, key)
        .await?
        .ok_or_else(|| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("operation record for key {key} vanished after upsert"),
            )
        })?;

    in_scope(scope, key, stored)
}

pub async fn purge_expired<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: OffsetDateTime,
) -> Result<u64, DomainError> {
    let result = operation_records::Entity::delete_many()
        .filter(operation_records::Column::ExpiresAt.lt(now))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
