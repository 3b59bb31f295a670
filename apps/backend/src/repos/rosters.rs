//! Roster repository functions.

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};
use time::OffsetDateTime;

use crate::entities::{roster_players, rosters};
use crate::errors::domain::DomainError;

pub use crate::entities::rosters::Model as Roster;

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    roster_id: i64,
) -> Result<Option<Roster>, DomainError> {
    Ok(rosters::Entity::find_by_id(roster_id).one(conn).await?)
}

pub async fn create_roster<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    league_id: i64,
    user_id: Option<i64>,
    name: &str,
) -> Result<Roster, DomainError> {
    let roster = rosters::ActiveModel {
        id: NotSet,
        league_id: Set(league_id),
        user_id: Set(user_id),
        name: Set(name.to_string()),
        created_at: Set(OffsetDateTime::now_utc()),
    };
    Ok(roster.insert(conn).await?)
}

pub async fn list_by_league<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    league_id: i64,
) -> Result<Vec<Roster>, DomainError> {
    Ok(rosters::Entity::find()
        .filter(rosters::Column::LeagueId.eq(league_id))
        .order_by_asc(rosters::Column::Id)
        .all(conn)
        .await?)
}

/// Put drafted players on their rosters. Existing memberships are left alone.
pub async fn add_players_ignoring_existing<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    assignments: &[(i64, i64)],
    acquired_via: &str,
) -> Result<u64, DomainError> {
    if assignments.is_empty() {
        return Ok(0);
    }
    let now = OffsetDateTime::now_utc();
    let rows = assignments
        .iter()
        .map(|(roster_id, player_id)| roster_players::ActiveModel {
            id: NotSet,
            roster_id: Set(*roster_id),
            player_id: Set(*player_id),
            acquired_via: Set(acquired_via.to_string()),
            created_at: Set(now),
        });

    let inserted = roster_players::Entity::insert_many(rows)
        .on_conflict(
            OnConflict::columns([
                roster_players::Column::RosterId,
                roster_players::Column::PlayerId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(inserted)
}

pub async fn list_players<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    roster_id: i64,
) -> Result<Vec<roster_players::Model>, DomainError> {
    Ok(roster_players::Entity::find()
        .filter(roster_players::Column::RosterId.eq(roster_id))
        .order_by_asc(roster_players::Column::Id)
        .all(conn)
        .await?)
}
