//! Draft pick repository functions.
//!
//! Picks are immutable once written. Engine-generated picks carry an
//! idempotency key; inserting a second pick with the same key is a no-op that
//! returns the stored row.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;

use crate::entities::draft_picks;
use crate::errors::domain::{DomainError, InfraErrorKind};

pub use crate::entities::draft_picks::Model as DraftPick;

#[derive(Debug, Clone)]
pub struct PickCreate {
    pub draft_id: i64,
    pub pick_number: i32,
    pub round: i32,
    pub pick_in_round: i32,
    pub roster_id: i64,
    pub player_id: i64,
    pub is_auto_pick: bool,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickInsert {
    Created(DraftPick),
    /// A pick with the same idempotency key already existed.
    Replayed(DraftPick),
}

impl PickInsert {
    pub fn pick(&self) -> &DraftPick {
        match self {
            PickInsert::Created(p) | PickInsert::Replayed(p) => p,
        }
    }
}

pub async fn find_by_pick_number<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    pick_number: i32,
) -> Result<Option<DraftPick>, DomainError> {
    Ok(draft_picks::Entity::find()
        .filter(draft_picks::Column::DraftId.eq(draft_id))
        .filter(draft_picks::Column::PickNumber.eq(pick_number))
        .one(conn)
        .await?)
}

pub async fn find_by_idempotency_key<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    key: &str,
) -> Result<Option<DraftPick>, DomainError> {
    Ok(draft_picks::Entity::find()
        .filter(draft_picks::Column::DraftId.eq(draft_id))
        .filter(draft_picks::Column::IdempotencyKey.eq(key))
        .one(conn)
        .await?)
}

pub async fn list_for_draft<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
) -> Result<Vec<DraftPick>, DomainError> {
    Ok(draft_picks::Entity::find()
        .filter(draft_picks::Column::DraftId.eq(draft_id))
        .order_by_asc(draft_picks::Column::PickNumber)
        .all(conn)
        .await?)
}

pub async fn is_player_drafted<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
    player_id: i64,
) -> Result<bool, DomainError> {
    Ok(draft_picks::Entity::find()
        .filter(draft_picks::Column::DraftId.eq(draft_id))
        .filter(draft_picks::Column::PlayerId.eq(player_id))
        .one(conn)
        .await?
        .is_some())
}

/// Insert a pick; a keyed duplicate converges on the stored row.
pub async fn create_pick<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: PickCreate,
) -> Result<PickInsert, DomainError> {
    let draft_id = dto.draft_id;
    let pick_number = dto.pick_number;
    let key = dto.idempotency_key.clone();

    let row = draft_picks::ActiveModel {
        id: NotSet,
        draft_id: Set(dto.draft_id),
        pick_number: Set(dto.pick_number),
        round: Set(dto.round),
        pick_in_round: Set(dto.pick_in_round),
        roster_id: Set(dto.roster_id),
        player_id: Set(dto.player_id),
        is_auto_pick: Set(dto.is_auto_pick),
        idempotency_key: Set(dto.idempotency_key),
        created_at: Set(OffsetDateTime::now_utc()),
    };

    let inserted = draft_picks::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                draft_picks::Column::DraftId,
                draft_picks::Column::IdempotencyKey,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    if inserted == 1 {
        let created = find_by_pick_number(conn, draft_id, pick_number).await?;
        return created.map(PickInsert::Created).ok_or_else(|| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Pick {pick_number} of draft {draft_id} vanished after insert"),
            )
        });
    }

    let Some(key) = key else {
        return Err(DomainError::infra(
            InfraErrorKind::DataCorruption,
            format!("Unkeyed pick {pick_number} of draft {draft_id} was not inserted"),
        ));
    };
    find_by_idempotency_key(conn, draft_id, &key)
        .await?
        .map(PickInsert::Replayed)
        .ok_or_else(|| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Pick with key {key} conflicted but cannot be found"),
            )
        })
}
