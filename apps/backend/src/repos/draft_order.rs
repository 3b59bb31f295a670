//! Draft order repository functions.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};

use crate::entities::draft_order;
use crate::errors::domain::{DomainError, ForbiddenKind, NotFoundKind};

pub use crate::entities::draft_order::Model as DraftOrderEntry;

/// Entries sorted by draft position.
pub async fn list<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
) -> Result<Vec<DraftOrderEntry>, DomainError> {
    Ok(draft_order::Entity::find()
        .filter(draft_order::Column::DraftId.eq(draft_id))
        .order_by_asc(draft_order::Column::DraftPosition)
        .all(conn)
        .await?)
}

/// Write `roster_ids` as draft positions 1..=n.
pub async fn seed<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_ids: &[i64],
) -> Result<(), DomainError> {
    if roster_ids.is_empty() {
        return Ok(());
    }
    let rows = roster_ids
        .iter()
        .enumerate()
        .map(|(idx, roster_id)| draft_order::ActiveModel {
            id: NotSet,
            draft_id: Set(draft_id),
            roster_id: Set(*roster_id),
            draft_position: Set(idx as i32 + 1),
            autodraft_enabled: Set(false),
        });
    draft_order::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn find_entry<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_id: i64,
) -> Result<Option<DraftOrderEntry>, DomainError> {
    Ok(draft_order::Entity::find()
        .filter(draft_order::Column::DraftId.eq(draft_id))
        .filter(draft_order::Column::RosterId.eq(roster_id))
        .one(conn)
        .await?)
}

pub async fn require_entry<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_id: i64,
) -> Result<DraftOrderEntry, DomainError> {
    find_entry(conn, draft_id, roster_id).await?.ok_or_else(|| {
        DomainError::not_found(
            NotFoundKind::Roster,
            format!("Roster {roster_id} is not part of draft {draft_id}"),
        )
    })
}

/// The caller's entry in this draft, found through roster ownership.
pub async fn require_owned_entry<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    user_id: i64,
) -> Result<DraftOrderEntry, DomainError> {
    use crate::entities::rosters;

    let owned: Vec<i64> = rosters::Entity::find()
        .filter(rosters::Column::UserId.eq(user_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    draft_order::Entity::find()
        .filter(draft_order::Column::DraftId.eq(draft_id))
        .filter(draft_order::Column::RosterId.is_in(owned))
        .one(conn)
        .await?
        .ok_or_else(|| {
            DomainError::forbidden(
                ForbiddenKind::NotARosterOwner,
                format!("You do not own a roster in draft {draft_id}"),
            )
        })
}

pub async fn set_autodraft<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    roster_id: i64,
    enabled: bool,
) -> Result<(), DomainError> {
    draft_order::Entity::update_many()
        .col_expr(draft_order::Column::AutodraftEnabled, Expr::value(enabled))
        .filter(draft_order::Column::DraftId.eq(draft_id))
        .filter(draft_order::Column::RosterId.eq(roster_id))
        .exec(conn)
        .await?;
    Ok(())
}
