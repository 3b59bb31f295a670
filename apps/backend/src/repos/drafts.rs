//! Draft repository functions.
//!
//! Pointer updates are compare-and-set on `current_pick` so the pointer can
//! only ever move forward, even if two writers race past the advisory lock.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::entities::drafts::{self, DraftStatus, DraftType};
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind};

pub use crate::entities::drafts::Model as Draft;

/// Settings for a new draft.
#[derive(Debug, Clone)]
pub struct DraftCreate {
    pub league_id: i64,
    pub season: i32,
    pub draft_type: DraftType,
    pub rounds: i32,
    pub pick_time_seconds: i32,
}

/// Where the pointer goes after a pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerUpdate {
    pub pick: i32,
    pub round: i32,
    pub roster_id: i64,
    pub deadline: OffsetDateTime,
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
) -> Result<Option<Draft>, DomainError> {
    Ok(drafts::Entity::find_by_id(draft_id).one(conn).await?)
}

pub async fn require_draft<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
) -> Result<Draft, DomainError> {
    find_by_id(conn, draft_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Draft, format!("Draft {draft_id} not found"))
    })
}

pub async fn create_draft<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: DraftCreate,
) -> Result<Draft, DomainError> {
    let now = OffsetDateTime::now_utc();
    let draft = drafts::ActiveModel {
        id: NotSet,
        league_id: Set(dto.league_id),
        season: Set(dto.season),
        draft_type: Set(dto.draft_type),
        status: Set(DraftStatus::NotStarted),
        rounds: Set(dto.rounds),
        pick_time_seconds: Set(dto.pick_time_seconds),
        current_pick: Set(0),
        current_round: Set(0),
        current_roster_id: Set(None),
        pick_deadline: Set(None),
        started_at: Set(None),
        completed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(draft.insert(conn).await?)
}

/// Ids of drafts the ticker should visit.
pub async fn list_in_progress_ids<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<i64>, DomainError> {
    Ok(drafts::Entity::find()
        .select_only()
        .column(drafts::Column::Id)
        .filter(drafts::Column::Status.eq(DraftStatus::InProgress))
        .order_by_asc(drafts::Column::Id)
        .into_tuple::<i64>()
        .all(conn)
        .await?)
}

pub async fn latest_for_league<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    league_id: i64,
) -> Result<Option<Draft>, DomainError> {
    Ok(drafts::Entity::find()
        .filter(drafts::Column::LeagueId.eq(league_id))
        .order_by_desc(drafts::Column::Season)
        .order_by_desc(drafts::Column::Id)
        .one(conn)
        .await?)
}

pub async fn list_for_league_season<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    league_id: i64,
    season: i32,
) -> Result<Vec<Draft>, DomainError> {
    Ok(drafts::Entity::find()
        .filter(drafts::Column::LeagueId.eq(league_id))
        .filter(drafts::Column::Season.eq(season))
        .order_by_asc(drafts::Column::Id)
        .all(conn)
        .await?)
}

/// Transition `not_started -> in_progress` with the pointer on pick 1.
pub async fn start<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    first: PointerUpdate,
) -> Result<Draft, DomainError> {
    let now = OffsetDateTime::now_utc();
    let result = drafts::Entity::update_many()
        .col_expr(drafts::Column::Status, Expr::value(DraftStatus::InProgress))
        .col_expr(drafts::Column::CurrentPick, Expr::value(first.pick))
        .col_expr(drafts::Column::CurrentRound, Expr::value(first.round))
        .col_expr(drafts::Column::CurrentRosterId, Expr::value(first.roster_id))
        .col_expr(drafts::Column::PickDeadline, Expr::value(first.deadline))
        .col_expr(drafts::Column::StartedAt, Expr::value(now))
        .col_expr(drafts::Column::UpdatedAt, Expr::value(now))
        .filter(drafts::Column::Id.eq(draft_id))
        .filter(drafts::Column::Status.eq(DraftStatus::NotStarted))
        .exec(conn)
        .await?;
    expect_one_row(result.rows_affected, draft_id, "start")?;
    require_draft(conn, draft_id).await
}

/// Compare-and-set the pointer from `expected_pick` to `next`.
pub async fn advance_pointer<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    expected_pick: i32,
    next: PointerUpdate,
) -> Result<Draft, DomainError> {
    let result = drafts::Entity::update_many()
        .col_expr(drafts::Column::CurrentPick, Expr::value(next.pick))
        .col_expr(drafts::Column::CurrentRound, Expr::value(next.round))
        .col_expr(drafts::Column::CurrentRosterId, Expr::value(next.roster_id))
        .col_expr(drafts::Column::PickDeadline, Expr::value(next.deadline))
        .col_expr(
            drafts::Column::UpdatedAt,
            Expr::value(OffsetDateTime::now_utc()),
        )
        .filter(drafts::Column::Id.eq(draft_id))
        .filter(drafts::Column::CurrentPick.eq(expected_pick))
        .filter(drafts::Column::CurrentPick.lt(next.pick))
        .filter(drafts::Column::Status.eq(DraftStatus::InProgress))
        .exec(conn)
        .await?;
    expect_one_row(result.rows_affected, draft_id, "advance")?;
    require_draft(conn, draft_id).await
}

/// Terminal transition; clears the pointer fields.
pub async fn complete<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    expected_pick: i32,
) -> Result<Draft, DomainError> {
    let now = OffsetDateTime::now_utc();
    let result = drafts::Entity::update_many()
        .col_expr(drafts::Column::Status, Expr::value(DraftStatus::Completed))
        .col_expr(
            drafts::Column::CurrentRosterId,
            Expr::value(Option::<i64>::None),
        )
        .col_expr(
            drafts::Column::PickDeadline,
            Expr::value(Option::<OffsetDateTime>::None),
        )
        .col_expr(drafts::Column::CompletedAt, Expr::value(now))
        .col_expr(drafts::Column::UpdatedAt, Expr::value(now))
        .filter(drafts::Column::Id.eq(draft_id))
        .filter(drafts::Column::CurrentPick.eq(expected_pick))
        .filter(drafts::Column::Status.eq(DraftStatus::InProgress))
        .exec(conn)
        .await?;
    expect_one_row(result.rows_affected, draft_id, "complete")?;
    require_draft(conn, draft_id).await
}

/// Status change used by pause/resume; `deadline` replaces the pick deadline.
pub async fn set_status<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    from: DraftStatus,
    to: DraftStatus,
    deadline: Option<OffsetDateTime>,
) -> Result<Draft, DomainError> {
    let result = drafts::Entity::update_many()
        .col_expr(drafts::Column::Status, Expr::value(to))
        .col_expr(drafts::Column::PickDeadline, Expr::value(deadline))
        .col_expr(
            drafts::Column::UpdatedAt,
            Expr::value(OffsetDateTime::now_utc()),
        )
        .filter(drafts::Column::Id.eq(draft_id))
        .filter(drafts::Column::Status.eq(from))
        .exec(conn)
        .await?;
    expect_one_row(result.rows_affected, draft_id, "status change")?;
    require_draft(conn, draft_id).await
}

fn expect_one_row(rows: u64, draft_id: i64, what: &str) -> Result<(), DomainError> {
    if rows == 0 {
        return Err(DomainError::conflict(
            ConflictKind::OptimisticLock,
            format!("Draft {draft_id} changed concurrently during {what}"),
        ));
    }
    Ok(())
}
