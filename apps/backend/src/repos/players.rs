//! Player pool repository functions.

use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};
use time::OffsetDateTime;

use crate::entities::{draft_picks, players};
use crate::errors::domain::{DomainError, NotFoundKind};

pub use crate::entities::players::Model as Player;

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
) -> Result<Option<Player>, DomainError> {
    Ok(players::Entity::find_by_id(player_id).one(conn).await?)
}

pub async fn require_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
) -> Result<Player, DomainError> {
    find_by_id(conn, player_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Player, format!("Player {player_id} not found"))
    })
}

pub async fn create_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    full_name: &str,
    position: &str,
    rank: i32,
) -> Result<Player, DomainError> {
    let player = players::ActiveModel {
        id: NotSet,
        full_name: Set(full_name.to_string()),
        position: Set(position.to_string()),
        rank: Set(rank),
        created_at: Set(OffsetDateTime::now_utc()),
    };
    Ok(player.insert(conn).await?)
}

/// Highest-ranked player not yet drafted in `draft_id`. Ties break on id.
pub async fn best_available<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    draft_id: i64,
) -> Result<Option<Player>, DomainError> {
    let drafted = Query::select()
        .column(draft_picks::Column::PlayerId)
        .from(draft_picks::Entity)
        .and_where(draft_picks::Column::DraftId.eq(draft_id))
        .to_owned();

    Ok(players::Entity::find()
        .filter(players::Column::Id.not_in_subquery(drafted))
        .order_by_asc(players::Column::Rank)
        .order_by_asc(players::Column::Id)
        .one(conn)
        .await?)
}
