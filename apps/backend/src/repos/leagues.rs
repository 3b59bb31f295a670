//! League repository functions.

use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};
use time::OffsetDateTime;

use crate::entities::leagues;
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind};

pub use crate::entities::leagues::Model as League;

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    league_id: i64,
) -> Result<Option<League>, DomainError> {
    Ok(leagues::Entity::find_by_id(league_id).one(conn).await?)
}

pub async fn require_league<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    league_id: i64,
) -> Result<League, DomainError> {
    find_by_id(conn, league_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::League, format!("League {league_id} not found"))
    })
}

pub async fn create_league<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    name: &str,
    season: i32,
    commissioner_user_id: i64,
) -> Result<League, DomainError> {
    let now = OffsetDateTime::now_utc();
    let league = leagues::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        season: Set(season),
        commissioner_user_id: Set(commissioner_user_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(league.insert(conn).await?)
}

/// Move the league from `expected_season` to the next one.
pub async fn advance_season<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    league_id: i64,
    expected_season: i32,
) -> Result<i32, DomainError> {
    let next = expected_season + 1;
    let result = leagues::Entity::update_many()
        .col_expr(leagues::Column::Season, Expr::value(next))
        .col_expr(
            leagues::Column::UpdatedAt,
            Expr::value(OffsetDateTime::now_utc()),
        )
        .filter(leagues::Column::Id.eq(league_id))
        .filter(leagues::Column::Season.eq(expected_season))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::conflict(
            ConflictKind::OptimisticLock,
            format!("League {league_id} is no longer in season {expected_season}"),
        ));
    }
    Ok(next)
}
