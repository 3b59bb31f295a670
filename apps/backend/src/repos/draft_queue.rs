//! Per-roster draft queue.

use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::entities::{draft_picks, draft_queue};
use crate::errors::domain::DomainError;

pub use crate::entities::draft_queue::Model as QueueEntry;

/// Queue front to back.
pub async fn list_for_roster<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_id: i64,
) -> Result<Vec<QueueEntry>, DomainError> {
    Ok(draft_queue::Entity::find()
        .filter(draft_queue::Column::DraftId.eq(draft_id))
        .filter(draft_queue::Column::RosterId.eq(roster_id))
        .order_by_asc(draft_queue::Column::QueueRank)
        .order_by_asc(draft_queue::Column::Id)
        .all(conn)
        .await?)
}

/// Append to the back of the queue.
pub async fn append<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_id: i64,
    player_id: i64,
) -> Result<(), DomainError> {
    let max_rank: Option<i32> = draft_queue::Entity::find()
        .select_only()
        .column_as(Expr::col(draft_queue::Column::QueueRank).max(), "max_rank")
        .filter(draft_queue::Column::DraftId.eq(draft_id))
        .filter(draft_queue::Column::RosterId.eq(roster_id))
        .into_tuple::<Option<i32>>()
        .one(conn)
        .await?
        .flatten();

    let row = draft_queue::ActiveModel {
        id: NotSet,
        draft_id: Set(draft_id),
        roster_id: Set(roster_id),
        player_id: Set(player_id),
        queue_rank: Set(max_rank.unwrap_or(0) + 1),
        created_at: Set(OffsetDateTime::now_utc()),
    };
    draft_queue::Entity::insert(row)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Remove one player from the roster's queue; returns whether a row went away.
pub async fn remove<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_id: i64,
    player_id: i64,
) -> Result<bool, DomainError> {
    let result = draft_queue::Entity::delete_many()
        .filter(draft_queue::Column::DraftId.eq(draft_id))
        .filter(draft_queue::Column::RosterId.eq(roster_id))
        .filter(draft_queue::Column::PlayerId.eq(player_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn delete_entries<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    entry_ids: &[i64],
) -> Result<u64, DomainError> {
    if entry_ids.is_empty() {
        return Ok(0);
    }
    let result = draft_queue::Entity::delete_many()
        .filter(draft_queue::Column::Id.is_in(entry_ids.iter().copied()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Drop the roster's queue entries whose player has since been drafted.
pub async fn prune_drafted<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_id: i64,
) -> Result<u64, DomainError> {
    let drafted = Query::select()
        .column(draft_picks::Column::PlayerId)
        .from(draft_picks::Entity)
        .and_where(draft_picks::Column::DraftId.eq(draft_id))
        .to_owned();
    let result = draft_queue::Entity::delete_many()
        .filter(draft_queue::Column::DraftId.eq(draft_id))
        .filter(draft_queue::Column::RosterId.eq(roster_id))
        .filter(draft_queue::Column::PlayerId.in_subquery(drafted))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
