use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, IndexCreateStatement, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden, Clone, Copy)]
enum Leagues {
    Table,
    Id,
    Name,
    Season,
    CommissionerUserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
enum Rosters {
    Table,
    Id,
    LeagueId,
    UserId,
    Name,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum Players {
    Table,
    Id,
    FullName,
    Position,
    Rank,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum Drafts {
    Table,
    Id,
    LeagueId,
    Season,
    DraftType,
    Status,
    Rounds,
    PickTimeSeconds,
    CurrentPick,
    CurrentRound,
    CurrentRosterId,
    PickDeadline,
    StartedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
enum DraftOrder {
    Table,
    Id,
    DraftId,
    RosterId,
    DraftPosition,
    AutodraftEnabled,
}

#[derive(Iden, Clone, Copy)]
enum DraftPicks {
    Table,
    Id,
    DraftId,
    PickNumber,
    Round,
    PickInRound,
    RosterId,
    PlayerId,
    IsAutoPick,
    IdempotencyKey,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum DraftQueue {
    Table,
    Id,
    DraftId,
    RosterId,
    PlayerId,
    QueueRank,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum RosterPlayers {
    Table,
    Id,
    RosterId,
    PlayerId,
    AcquiredVia,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum IdempotencyClaims {
    Table,
    Id,
    IdempotencyKey,
    UserId,
    Method,
    Path,
    State,
    ResponseStatus,
    ResponseBody,
    ResponseContentType,
    CreatedAt,
    ExpiresAt,
}

#[derive(Iden, Clone, Copy)]
enum OperationRecords {
    Table,
    Id,
    IdempotencyKey,
    UserId,
    OperationKind,
    LeagueId,
    Response,
    CreatedAt,
    ExpiresAt,
}

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .primary_key()
        .auto_increment()
        .to_owned()
}

fn unique_index<T: IntoIden + Copy + 'static>(name: &str, table: T, cols: &[T]) -> IndexCreateStatement {
    let mut index = Index::create();
    index.name(name).table(table).unique();
    for col in cols {
        index.col(*col);
    }
    index.to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // leagues
        manager
            .create_table(
                Table::create()
                    .table(Leagues::Table)
                    .if_not_exists()
                    .col(id_col(Leagues::Id))
                    .col(ColumnDef::new(Leagues::Name).string().not_null())
                    .col(ColumnDef::new(Leagues::Season).integer().not_null())
                    .col(
                        ColumnDef::new(Leagues::CommissionerUserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Leagues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Leagues::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // rosters
        manager
            .create_table(
                Table::create()
                    .table(Rosters::Table)
                    .if_not_exists()
                    .col(id_col(Rosters::Id))
                    .col(ColumnDef::new(Rosters::LeagueId).big_integer().not_null())
                    .col(ColumnDef::new(Rosters::UserId).big_integer().null())
                    .col(ColumnDef::new(Rosters::Name).string().not_null())
                    .col(
                        ColumnDef::new(Rosters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rosters_league_id")
                            .from(Rosters::Table, Rosters::LeagueId)
                            .to(Leagues::Table, Leagues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // players
        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(id_col(Players::Id))
                    .col(ColumnDef::new(Players::FullName).string().not_null())
                    .col(ColumnDef::new(Players::Position).string().not_null())
                    .col(ColumnDef::new(Players::Rank).integer().not_null())
                    .col(
                        ColumnDef::new(Players::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_players_rank")
                    .table(Players::Table)
                    .col(Players::Rank)
                    .to_owned(),
            )
            .await?;

        // drafts
        manager
            .create_table(
                Table::create()
                    .table(Drafts::Table)
                    .if_not_exists()
                    .col(id_col(Drafts::Id))
                    .col(ColumnDef::new(Drafts::LeagueId).big_integer().not_null())
                    .col(ColumnDef::new(Drafts::Season).integer().not_null())
                    .col(ColumnDef::new(Drafts::DraftType).string().not_null())
                    .col(ColumnDef::new(Drafts::Status).string().not_null())
                    .col(ColumnDef::new(Drafts::Rounds).integer().not_null())
                    .col(
                        ColumnDef::new(Drafts::PickTimeSeconds)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Drafts::CurrentPick)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Drafts::CurrentRound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Drafts::CurrentRosterId).big_integer().null())
                    .col(
                        ColumnDef::new(Drafts::PickDeadline)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Drafts::StartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Drafts::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Drafts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Drafts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_drafts_league_id")
                            .from(Drafts::Table, Drafts::LeagueId)
                            .to(Leagues::Table, Leagues::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_drafts_status")
                    .table(Drafts::Table)
                    .col(Drafts::Status)
                    .to_owned(),
            )
            .await?;

        // draft_order
        manager
            .create_table(
                Table::create()
                    .table(DraftOrder::Table)
                    .if_not_exists()
                    .col(id_col(DraftOrder::Id))
                    .col(ColumnDef::new(DraftOrder::DraftId).big_integer().not_null())
                    .col(ColumnDef::new(DraftOrder::RosterId).big_integer().not_null())
                    .col(
                        ColumnDef::new(DraftOrder::DraftPosition)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DraftOrder::AutodraftEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_draft_order_draft_id")
                            .from(DraftOrder::Table, DraftOrder::DraftId)
                            .to(Drafts::Table, Drafts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_draft_order_roster_id")
                            .from(DraftOrder::Table, DraftOrder::RosterId)
                            .to(Rosters::Table, Rosters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(unique_index(
                "ux_draft_order_draft_roster",
                DraftOrder::Table,
                &[DraftOrder::DraftId, DraftOrder::RosterId],
            ))
            .await?;
        manager
            .create_index(unique_index(
                "ux_draft_order_draft_position",
                DraftOrder::Table,
                &[DraftOrder::DraftId, DraftOrder::DraftPosition],
            ))
            .await?;

        // draft_picks
        manager
            .create_table(
                Table::create()
                    .table(DraftPicks::Table)
                    .if_not_exists()
                    .col(id_col(DraftPicks::Id))
                    .col(ColumnDef::new(DraftPicks::DraftId).big_integer().not_null())
                    .col(ColumnDef::new(DraftPicks::PickNumber).integer().not_null())
                    .col(ColumnDef::new(DraftPicks::Round).integer().not_null())
                    .col(ColumnDef::new(DraftPicks::PickInRound).integer().not_null())
                    .col(ColumnDef::new(DraftPicks::RosterId).big_integer().not_null())
                    .col(ColumnDef::new(DraftPicks::PlayerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(DraftPicks::IsAutoPick)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DraftPicks::IdempotencyKey).string().null())
                    .col(
                        ColumnDef::new(DraftPicks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_draft_picks_draft_id")
                            .from(DraftPicks::Table, DraftPicks::DraftId)
                            .to(Drafts::Table, Drafts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_draft_picks_player_id")
                            .from(DraftPicks::Table, DraftPicks::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(unique_index(
                "ux_draft_picks_draft_pick_number",
                DraftPicks::Table,
                &[DraftPicks::DraftId, DraftPicks::PickNumber],
            ))
            .await?;
        manager
            .create_index(unique_index(
                "ux_draft_picks_draft_player",
                DraftPicks::Table,
                &[DraftPicks::DraftId, DraftPicks::PlayerId],
            ))
            .await?;
        manager
            .create_index(unique_index(
                "ux_draft_picks_draft_idempotency_key",
                DraftPicks::Table,
                &[DraftPicks::DraftId, DraftPicks::IdempotencyKey],
            ))
            .await?;

        // draft_queue
        manager
            .create_table(
                Table::create()
                    .table(DraftQueue::Table)
                    .if_not_exists()
                    .col(id_col(DraftQueue::Id))
                    .col(ColumnDef::new(DraftQueue::DraftId).big_integer().not_null())
                    .col(ColumnDef::new(DraftQueue::RosterId).big_integer().not_null())
                    .col(ColumnDef::new(DraftQueue::PlayerId).big_integer().not_null())
                    .col(ColumnDef::new(DraftQueue::QueueRank).integer().not_null())
                    .col(
                        ColumnDef::new(DraftQueue::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_draft_queue_draft_id")
                            .from(DraftQueue::Table, DraftQueue::DraftId)
                            .to(Drafts::Table, Drafts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(unique_index(
                "ux_draft_queue_draft_roster_player",
                DraftQueue::Table,
                &[DraftQueue::DraftId, DraftQueue::RosterId, DraftQueue::PlayerId],
            ))
            .await?;

        // roster_players
        manager
            .create_table(
                Table::create()
                    .table(RosterPlayers::Table)
                    .if_not_exists()
                    .col(id_col(RosterPlayers::Id))
                    .col(ColumnDef::new(RosterPlayers::RosterId).big_integer().not_null())
                    .col(ColumnDef::new(RosterPlayers::PlayerId).big_integer().not_null())
                    .col(ColumnDef::new(RosterPlayers::AcquiredVia).string().not_null())
                    .col(
                        ColumnDef::new(RosterPlayers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_roster_players_roster_id")
                            .from(RosterPlayers::Table, RosterPlayers::RosterId)
                            .to(Rosters::Table, Rosters::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(unique_index(
                "ux_roster_players_roster_player",
                RosterPlayers::Table,
                &[RosterPlayers::RosterId, RosterPlayers::PlayerId],
            ))
            .await?;

        // idempotency_claims
        manager
            .create_table(
                Table::create()
                    .table(IdempotencyClaims::Table)
                    .if_not_exists()
                    .col(id_col(IdempotencyClaims::Id))
                    .col(
                        ColumnDef::new(IdempotencyClaims::IdempotencyKey)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(IdempotencyClaims::UserId).big_integer().not_null())
                    .col(ColumnDef::new(IdempotencyClaims::Method).string_len(16).not_null())
                    .col(ColumnDef::new(IdempotencyClaims::Path).string().not_null())
                    .col(ColumnDef::new(IdempotencyClaims::State).string_len(16).not_null())
                    .col(ColumnDef::new(IdempotencyClaims::ResponseStatus).integer().null())
                    .col(ColumnDef::new(IdempotencyClaims::ResponseBody).json().null())
                    .col(
                        ColumnDef::new(IdempotencyClaims::ResponseContentType)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(IdempotencyClaims::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IdempotencyClaims::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(unique_index(
                "ux_idempotency_claims_key_user",
                IdempotencyClaims::Table,
                &[IdempotencyClaims::IdempotencyKey, IdempotencyClaims::UserId],
            ))
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_idempotency_claims_expires_at")
                    .table(IdempotencyClaims::Table)
                    .col(IdempotencyClaims::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // operation_records
        manager
            .create_table(
                Table::create()
                    .table(OperationRecords::Table)
                    .if_not_exists()
                    .col(id_col(OperationRecords::Id))
                    .col(
                        ColumnDef::new(OperationRecords::IdempotencyKey)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OperationRecords::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(OperationRecords::OperationKind)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OperationRecords::LeagueId).big_integer().null())
                    .col(ColumnDef::new(OperationRecords::Response).json().not_null())
                    .col(
                        ColumnDef::new(OperationRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationRecords::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(unique_index(
                "ux_operation_records_key_user_kind",
                OperationRecords::Table,
                &[
                    OperationRecords::IdempotencyKey,
                    OperationRecords::UserId,
                    OperationRecords::OperationKind,
                ],
            ))
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_operation_records_expires_at")
                    .table(OperationRecords::Table)
                    .col(OperationRecords::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // drop in reverse order; indexes go with their tables
        manager
            .drop_table(Table::drop().table(OperationRecords::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IdempotencyClaims::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RosterPlayers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DraftQueue::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DraftPicks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DraftOrder::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Drafts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Players::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rosters::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Leagues::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
