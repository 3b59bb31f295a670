use sea_orm::ConnectionTrait;

use crate::entities::drafts::DraftType;
use crate::error::AppError;
use crate::repos::drafts::{self, DraftCreate};
use crate::repos::{draft_order, leagues, players, rosters};

/// Shape of a seeded league.
#[derive(Debug, Clone)]
pub struct LeagueSeed {
    pub rosters: usize,
    pub players: usize,
    pub draft_type: DraftType,
    pub rounds: i32,
    pub pick_time_seconds: i32,
}

impl Default for LeagueSeed {
    fn default() -> Self {
        Self {
            rosters: 2,
            players: 6,
            draft_type: DraftType::Snake,
            rounds: 2,
            pick_time_seconds: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeagueFixture {
    pub league_id: i64,
    pub season: i32,
    pub commissioner_id: i64,
    /// `(roster_id, owner user id)` in draft-position order.
    pub rosters: Vec<(i64, i64)>,
    /// Player ids, best rank first.
    pub players: Vec<i64>,
    pub draft_id: i64,
}

impl LeagueFixture {
    /// Roster at 1-based draft `position`.
    pub fn roster_id(&self, position: usize) -> i64 {
        self.rosters[position - 1].0
    }

    pub fn owner(&self, position: usize) -> i64 {
        self.rosters[position - 1].1
    }
}

/// League with one owned roster per draft position, a ranked player pool and
/// a not-started draft whose order follows roster creation.
///
/// The commissioner is user 1; roster owners are users 101, 102, ...
pub async fn seed_league<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    seed: LeagueSeed,
) -> Result<LeagueFixture, AppError> {
    let commissioner_id = 1;
    let season = 2025;
    let league = leagues::create_league(conn, "Test League", season, commissioner_id).await?;

    let mut roster_rows = Vec::with_capacity(seed.rosters);
    for i in 0..seed.rosters {
        let owner = 101 + i as i64;
        let name = format!("Team {}", i + 1);
        let roster = rosters::create_roster(conn, league.id, Some(owner), &name).await?;
        roster_rows.push((roster.id, owner));
    }

    let mut player_ids = Vec::with_capacity(seed.players);
    for rank in 1..=seed.players as i32 {
        let player = players::create_player(conn, &format!("Player {rank}"), "WR", rank).await?;
        player_ids.push(player.id);
    }

    let draft = drafts::create_draft(
        conn,
        DraftCreate {
            league_id: league.id,
            season,
            draft_type: seed.draft_type,
            rounds: seed.rounds,
            pick_time_seconds: seed.pick_time_seconds,
        },
    )
    .await?;
    let roster_ids: Vec<i64> = roster_rows.iter().map(|(id, _)| *id).collect();
    draft_order::seed(conn, draft.id, &roster_ids).await?;

    Ok(LeagueFixture {
        league_id: league.id,
        season,
        commissioner_id,
        rosters: roster_rows,
        players: player_ids,
        draft_id: draft.id,
    })
}
