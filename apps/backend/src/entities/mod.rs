pub mod draft_order;
pub mod draft_picks;
pub mod draft_queue;
pub mod drafts;
pub mod idempotency_claims;
pub mod leagues;
pub mod operation_records;
pub mod players;
pub mod roster_players;
pub mod rosters;

pub use draft_order::Entity as DraftOrder;
pub use draft_picks::Entity as DraftPicks;
pub use draft_queue::Entity as DraftQueue;
pub use drafts::Entity as Drafts;
pub use idempotency_claims::Entity as IdempotencyClaims;
pub use leagues::Entity as Leagues;
pub use operation_records::Entity as OperationRecords;
pub use players::Entity as Players;
pub use roster_players::Entity as RosterPlayers;
pub use rosters::Entity as Rosters;
