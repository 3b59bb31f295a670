use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    #[sea_orm(string_value = "not_started")]
    NotStarted,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DraftType {
    #[sea_orm(string_value = "snake")]
    Snake,
    #[sea_orm(string_value = "linear")]
    Linear,
    #[sea_orm(string_value = "auction")]
    Auction,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drafts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "league_id")]
    pub league_id: i64,
    pub season: i32,
    #[sea_orm(column_name = "draft_type")]
    pub draft_type: DraftType,
    pub status: DraftStatus,
    pub rounds: i32,
    #[sea_orm(column_name = "pick_time_seconds")]
    pub pick_time_seconds: i32,
    #[sea_orm(column_name = "current_pick")]
    pub current_pick: i32,
    #[sea_orm(column_name = "current_round")]
    pub current_round: i32,
    #[sea_orm(column_name = "current_roster_id")]
    pub current_roster_id: Option<i64>,
    #[sea_orm(column_name = "pick_deadline")]
    pub pick_deadline: Option<OffsetDateTime>,
    #[sea_orm(column_name = "started_at")]
    pub started_at: Option<OffsetDateTime>,
    #[sea_orm(column_name = "completed_at")]
    pub completed_at: Option<OffsetDateTime>,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
    #[sea_orm(column_name = "updated_at")]
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::leagues::Entity",
        from = "Column::LeagueId",
        to = "super::leagues::Column::Id"
    )]
    League,
    #[sea_orm(has_many = "super::draft_order::Entity")]
    DraftOrder,
    #[sea_orm(has_many = "super::draft_picks::Entity")]
    DraftPicks,
}

impl Related<super::leagues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::League.def()
    }
}

impl Related<super::draft_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DraftOrder.def()
    }
}

impl Related<super::draft_picks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DraftPicks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
