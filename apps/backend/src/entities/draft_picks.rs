use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "draft_picks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "draft_id")]
    pub draft_id: i64,
    #[sea_orm(column_name = "pick_number")]
    pub pick_number: i32,
    pub round: i32,
    #[sea_orm(column_name = "pick_in_round")]
    pub pick_in_round: i32,
    #[sea_orm(column_name = "roster_id")]
    pub roster_id: i64,
    #[sea_orm(column_name = "player_id")]
    pub player_id: i64,
    #[sea_orm(column_name = "is_auto_pick")]
    pub is_auto_pick: bool,
    #[sea_orm(column_name = "idempotency_key")]
    pub idempotency_key: Option<String>,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::drafts::Entity",
        from = "Column::DraftId",
        to = "super::drafts::Column::Id"
    )]
    Draft,
}

impl Related<super::drafts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Draft.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
