use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "draft_order")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "draft_id")]
    pub draft_id: i64,
    #[sea_orm(column_name = "roster_id")]
    pub roster_id: i64,
    /// 1-based slot in the first round.
    #[sea_orm(column_name = "draft_position")]
    pub draft_position: i32,
    #[sea_orm(column_name = "autodraft_enabled")]
    pub autodraft_enabled: bool,
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
