//! Storage for HTTP-layer idempotency claims.
//!
//! A claim row moves `pending -> completed` exactly once. Pending rows are
//! deleted when the request dies before a response is captured; expired rows
//! of either state may be reclaimed by a new request.

use lazy_regex::regex_is_match;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::entities::idempotency_claims::{self, ClaimState};
use crate::errors::domain::DomainError;

pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";
pub const MAX_KEY_LEN: usize = 256;

/// Keys are 1..=256 characters of `[A-Za-z0-9._:-]`.
pub fn is_valid_key(key: &str) -> bool {
    key.len() <= MAX_KEY_LEN && regex_is_match!(r"^[A-Za-z0-9._:\-]+$", key)
}

#[derive(Debug, Clone)]
pub struct NewClaim<'a> {
    pub key: &'a str,
    pub user_id: i64,
    pub method: &'a str,
    pub path: &'a str,
    pub ttl: Duration,
}

/// A captured response, as stored and as replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status: u16,
    /// `None` means the response had no body.
    pub body: Option<Value>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// This request owns the key and should run the handler.
    Claimed { claim_id: i64 },
    /// An earlier request with this key finished; send its response again.
    Replay(StoredResponse),
    /// An earlier request with this key is still running.
    InFlight,
    /// The key was first used for a different method or path.
    KeyReused,
}

/// Claim `new.key` for `new.user_id`, or report what already holds it.
pub async fn claim<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    new: &NewClaim<'_>,
) -> Result<ClaimOutcome, DomainError> {
    // One retry after clearing an expired row.
    for _ in 0..2 {
        let now = OffsetDateTime::now_utc();
        if let Some(claim_id) = try_insert(conn, new, now).await? {
            return Ok(ClaimOutcome::Claimed { claim_id });
        }

        let Some(existing) = find(conn, new.key, new.user_id).await? else {
            // Deleted between our insert and select; try again.
            continue;
        };

        if existing.expires_at <= now {
            debug!(claim_id = existing.id, "Reclaiming expired idempotency claim");
            delete_row(conn, existing.id).await?;
            continue;
        }

        if existing.method != new.method || existing.path != new.path {
            return Ok(ClaimOutcome::KeyReused);
        }

        return Ok(match existing.state {
            ClaimState::Pending => ClaimOutcome::InFlight,
            ClaimState::Completed => ClaimOutcome::Replay(StoredResponse {
                status: existing
                    .response_status
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(200),
                body: existing.response_body,
                content_type: existing.response_content_type,
            }),
        });
    }

    Ok(ClaimOutcome::InFlight)
}

async fn try_insert<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    new: &NewClaim<'_>,
    now: OffsetDateTime,
) -> Result<Option<i64>, DomainError> {
    let row = idempotency_claims::ActiveModel {
        id: NotSet,
        idempotency_key: Set(new.key.to_string()),
        user_id: Set(new.user_id),
        method: Set(new.method.to_string()),
        path: Set(new.path.to_string()),
        state: Set(ClaimState::Pending),
        response_status: Set(None),
        response_body: Set(None),
        response_content_type: Set(None),
        created_at: Set(now),
        expires_at: Set(now + new.ttl),
    };

    let inserted = idempotency_claims::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                idempotency_claims::Column::IdempotencyKey,
                idempotency_claims::Column::UserId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    if inserted == 0 {
        return Ok(None);
    }
    Ok(find(conn, new.key, new.user_id).await?.map(|row| row.id))
}

pub async fn find<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    key: &str,
    user_id: i64,
) -> Result<Option<idempotency_claims::Model>, DomainError> {
    Ok(idempotency_claims::Entity::find()
        .filter(idempotency_claims::Column::IdempotencyKey.eq(key))
        .filter(idempotency_claims::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

/// Record the response. Only the first call for a pending claim has effect.
pub async fn complete<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    claim_id: i64,
    response: &StoredResponse,
) -> Result<bool, DomainError> {
    let result = idempotency_claims::Entity::update_many()
        .col_expr(
            idempotency_claims::Column::State,
            Expr::value(ClaimState::Completed),
        )
        .col_expr(
            idempotency_claims::Column::ResponseStatus,
            Expr::value(i32::from(response.status)),
        )
        .col_expr(
            idempotency_claims::Column::ResponseBody,
            Expr::value(response.body.clone()),
        )
        .col_expr(
            idempotency_claims::Column::ResponseContentType,
            Expr::value(response.content_type.clone()),
        )
        .filter(idempotency_claims::Column::Id.eq(claim_id))
        .filter(idempotency_claims::Column::State.eq(ClaimState::Pending))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Drop a pending claim so a retry runs as new. Completed claims are kept.
pub async fn release<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    claim_id: i64,
) -> Result<bool, DomainError> {
    let result = idempotency_claims::Entity::delete_many()
        .filter(idempotency_claims::Column::Id.eq(claim_id))
        .filter(idempotency_claims::Column::State.eq(ClaimState::Pending))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn delete_row<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    claim_id: i64,
) -> Result<(), DomainError> {
    idempotency_claims::Entity::delete_by_id(claim_id)
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn purge_expired<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: OffsetDateTime,
) -> Result<u64, DomainError> {
    let result = idempotency_claims::Entity::delete_many()
        .filter(idempotency_claims::Column::ExpiresAt.lt(now))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
