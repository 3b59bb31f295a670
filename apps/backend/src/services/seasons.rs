//! Season rollover.
//!
//! Rollover touches three tables, so it is made retryable as a unit through
//! the operation store: the stored result is checked first, inside the
//! league lock, and written last in the same transaction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Duration;
use tracing::info;

use crate::db::{LockDomain, LockKey, TxnRunner};
use crate::entities::drafts::{DraftStatus, DraftType};
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, ForbiddenKind, InfraErrorKind};
use crate::idempotency::operations::{self, OperationKind, OperationScope};
use crate::repos::drafts::{self, DraftCreate};
use crate::repos::{draft_order, leagues, rosters};

const DEFAULT_DRAFT_TYPE: DraftType = DraftType::Snake;
const DEFAULT_ROUNDS: i32 = 15;
const DEFAULT_PICK_TIME_SECONDS: i32 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverResult {
    pub league_id: i64,
    pub season: i32,
    pub draft_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rollover {
    /// Stored response, identical for every retry with the same key.
    pub response: Value,
    pub replayed: bool,
}

#[derive(Clone)]
pub struct SeasonService {
    runner: TxnRunner,
    record_ttl: Duration,
}

impl SeasonService {
    pub fn new(runner: TxnRunner, record_ttl: Duration) -> Self {
        Self { runner, record_ttl }
    }

    pub async fn rollover_season(
        &self,
        league_id: i64,
        user_id: i64,
        idempotency_key: &str,
    ) -> Result<Rollover, AppError> {
        let lock = LockKey::try_new(LockDomain::League, league_id)?;
        let key = idempotency_key.to_owned();
        let ttl = self.record_ttl;
        let scope = OperationScope::league(OperationKind::SeasonRollover, league_id);

        self.runner
            .run_with_lock(lock, move |txn| {
                Box::pin(async move {
                    if let Some(done) = operations::find_by_key(txn, scope, user_id, &key).await? {
                        info!(league_id, operation_id = done.id, "Season rollover already applied");
                        return Ok(Rollover {
                            response: done.response,
                            replayed: true,
                        });
                    }

                    let league = leagues::require_league(txn, league_id).await?;
                    if league.commissioner_user_id != user_id {
                        return Err(DomainError::forbidden(
                            ForbiddenKind::NotCommissioner,
                            "Only the league commissioner can roll the season over",
                        )
                        .into());
                    }

                    let current = drafts::list_for_league_season(txn, league_id, league.season).await?;
                    if current
                        .iter()
                        .any(|d| matches!(d.status, DraftStatus::InProgress | DraftStatus::Paused))
                    {
                        return Err(DomainError::conflict(
                            ConflictKind::DraftInProgress,
                            format!("League {league_id} has an unfinished draft this season"),
                        )
                        .into());
                    }

                    let template = drafts::latest_for_league(txn, league_id).await?;
                    let season = leagues::advance_season(txn, league_id, league.season).await?;
                    let draft = drafts::create_draft(
                        txn,
                        DraftCreate {
                            league_id,
                            season,
                            draft_type: template.as_ref().map_or(DEFAULT_DRAFT_TYPE, |d| d.draft_type),
                            rounds: template.as_ref().map_or(DEFAULT_ROUNDS, |d| d.rounds),
                            pick_time_seconds: template
                                .as_ref()
                                .map_or(DEFAULT_PICK_TIME_SECONDS, |d| d.pick_time_seconds),
                        },
                    )
                    .await?;

                    let roster_ids: Vec<i64> = rosters::list_by_league(txn, league_id)
                        .await?
                        .into_iter()
                        .map(|r| r.id)
                        .collect();
                    draft_order::seed(txn, draft.id, &roster_ids).await?;

                    let result = RolloverResult {
                        league_id,
                        season,
                        draft_id: draft.id,
                    };
                    let response = serde_json::to_value(&result).map_err(|e| {
                        DomainError::infra(
                            InfraErrorKind::Other("serialize".into()),
                            format!("Failed to encode rollover result: {e}"),
                        )
                    })?;
                    let stored = operations::create(txn, scope, user_id, &key, response, ttl).await?;

                    info!(league_id, season, draft_id = draft.id, "Season rolled over");
                    Ok(Rollover {
                        response: stored.response,
                        replayed: false,
                    })
                })
            })
            .await
    }
}
