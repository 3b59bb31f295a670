//! Draft progression.
//!
//! Every mutation runs under the draft's advisory lock, so a tick can never
//! interleave with a manual pick on the same draft. Events are collected
//! while the transaction runs and emitted only after it commits.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::db::{LockDomain, LockKey, TxnRunner};
use crate::draft::order::{slot_for, strategy_for, PickSlot};
use crate::entities::drafts::DraftStatus;
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, ForbiddenKind, InfraErrorKind, ValidationKind};
use crate::errors::ErrorCode;
use crate::realtime::{DraftEvent, DraftEventSink};
use crate::repos::draft_order::{self, DraftOrderEntry};
use crate::repos::draft_picks::{self, DraftPick, PickCreate};
use crate::repos::draft_queue::{self, QueueEntry};
use crate::repos::drafts::{self, Draft, PointerUpdate};
use crate::repos::{leagues, players, rosters};

/// Roster acquisition source written when a draft completes.
const ACQUIRED_VIA_DRAFT: &str = "draft";

/// Idempotency key for the engine's pick at `pick_number`.
pub fn autopick_key(draft_id: i64, pick_number: i32) -> String {
    format!("autopick-{draft_id}-{pick_number}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not in progress, or the current picker still has time.
    Idle,
    /// An autopick was made and the pointer moved to the next pick.
    Picked { pick_number: i32, player_id: i64 },
    /// The current pick already existed; only the pointer was moved.
    Recovered { pick_number: i32 },
    /// The tick wrote or found the final pick and closed the draft.
    Completed { pick_number: i32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftSnapshot {
    pub draft: Draft,
    pub order: Vec<DraftOrderEntry>,
    pub picks: Vec<DraftPick>,
}

enum ManualPick {
    Made(DraftPick),
    /// The current pick already existed; the pointer was repaired instead.
    Repaired { pick_number: i32 },
}

#[derive(Clone)]
pub struct DraftEngine {
    runner: TxnRunner,
    events: Arc<dyn DraftEventSink>,
}

impl DraftEngine {
    pub fn new(runner: TxnRunner, events: Arc<dyn DraftEventSink>) -> Self {
        Self { runner, events }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.runner.db()
    }

    pub async fn tick(&self, draft_id: i64) -> Result<TickOutcome, AppError> {
        self.tick_at(draft_id, OffsetDateTime::now_utc()).await
    }

    /// Drive the draft once, as of `now`.
    pub async fn tick_at(&self, draft_id: i64, now: OffsetDateTime) -> Result<TickOutcome, AppError> {
        let key = draft_lock(draft_id)?;
        let (outcome, events) = self
            .runner
            .run_with_lock(key, move |txn| {
                Box::pin(async move {
                    let mut events = Vec::new();
                    let outcome = tick_locked(txn, draft_id, now, &mut events).await?;
                    Ok((outcome, events))
                })
            })
            .await?;

        if outcome != TickOutcome::Idle {
            debug!(draft_id, outcome = ?outcome, "Draft ticked");
        }
        self.events.emit_all(events);
        Ok(outcome)
    }

    /// Commissioner starts the draft: pointer on pick 1 with a fresh deadline.
    pub async fn start_draft(&self, draft_id: i64, user_id: i64) -> Result<Draft, AppError> {
        let now = OffsetDateTime::now_utc();
        let (draft, events) = self
            .runner
            .run_with_lock(draft_lock(draft_id)?, move |txn| {
                Box::pin(async move {
                    let draft = drafts::require_draft(txn, draft_id).await?;
                    require_commissioner(txn, &draft, user_id).await?;
                    if draft.status != DraftStatus::NotStarted {
                        return Err(invalid_state(&draft, "start").into());
                    }

                    let order = draft_order::list(txn, draft_id).await?;
                    if order.is_empty() {
                        return Err(DomainError::validation(
                            ValidationKind::EmptyDraftOrder,
                            format!("Draft {draft_id} has no draft order"),
                        )
                        .into());
                    }
                    let slot = slot_for(
                        strategy_for(draft.draft_type),
                        1,
                        order.len() as i32,
                        draft.rounds,
                    )
                    .ok_or_else(|| {
                        DomainError::validation(
                            ValidationKind::InvalidDraftState,
                            format!("Draft {draft_id} has no picks to make"),
                        )
                    })?;
                    let pointer = pointer_for(&draft, &order, slot, now)?;
                    let started = drafts::start(txn, draft_id, pointer).await?;
                    let events = vec![next_pick_event(&started, pointer)];
                    Ok((started, events))
                })
            })
            .await?;

        info!(draft_id, "Draft started");
        self.events.emit_all(events);
        Ok(draft)
    }

    /// Commissioner pauses; the pick deadline is cleared.
    pub async fn pause_draft(&self, draft_id: i64, user_id: i64) -> Result<Draft, AppError> {
        self.runner
            .run_with_lock(draft_lock(draft_id)?, move |txn| {
                Box::pin(async move {
                    let draft = drafts::require_draft(txn, draft_id).await?;
                    require_commissioner(txn, &draft, user_id).await?;
                    if draft.status != DraftStatus::InProgress {
                        return Err(invalid_state(&draft, "pause").into());
                    }
                    Ok(drafts::set_status(
                        txn,
                        draft_id,
                        DraftStatus::InProgress,
                        DraftStatus::Paused,
                        None,
                    )
                    .await?)
                })
            })
            .await
    }

    /// Commissioner resumes; the current picker gets a fresh deadline.
    pub async fn resume_draft(&self, draft_id: i64, user_id: i64) -> Result<Draft, AppError> {
        let now = OffsetDateTime::now_utc();
        let (draft, events) = self
            .runner
            .run_with_lock(draft_lock(draft_id)?, move |txn| {
                Box::pin(async move {
                    let draft = drafts::require_draft(txn, draft_id).await?;
                    require_commissioner(txn, &draft, user_id).await?;
                    if draft.status != DraftStatus::Paused {
                        return Err(invalid_state(&draft, "resume").into());
                    }
                    let deadline = deadline_from(&draft, now);
                    let resumed = drafts::set_status(
                        txn,
                        draft_id,
                        DraftStatus::Paused,
                        DraftStatus::InProgress,
                        Some(deadline),
                    )
                    .await?;

                    let mut events = Vec::new();
                    if let Some(roster_id) = resumed.current_roster_id {
                        events.push(DraftEvent::NextPick {
                            draft_id,
                            pick_number: resumed.current_pick,
                            round: resumed.current_round,
                            roster_id,
                            pick_deadline: resumed.pick_deadline,
                        });
                    }
                    Ok((resumed, events))
                })
            })
            .await?;

        self.events.emit_all(events);
        Ok(draft)
    }

    /// The current picker's owner drafts `player_id`.
    ///
    /// When the current pick already exists the pointer is repaired and the
    /// caller gets a 409 so they can look at the new state and retry.
    pub async fn make_pick(
        &self,
        draft_id: i64,
        user_id: i64,
        player_id: i64,
    ) -> Result<DraftPick, AppError> {
        let now = OffsetDateTime::now_utc();
        let (result, events) = self
            .runner
            .run_with_lock(draft_lock(draft_id)?, move |txn| {
                Box::pin(async move {
                    let mut events = Vec::new();
                    let result = manual_pick_locked(txn, draft_id, user_id, player_id, now, &mut events).await?;
                    Ok((result, events))
                })
            })
            .await?;

        self.events.emit_all(events);
        match result {
            ManualPick::Made(pick) => Ok(pick),
            ManualPick::Repaired { pick_number } => Err(AppError::conflict(
                ErrorCode::PickAlreadyMade,
                format!("Pick {pick_number} was already made; the draft has moved on"),
            )),
        }
    }

    pub async fn set_autodraft(
        &self,
        draft_id: i64,
        user_id: i64,
        enabled: bool,
    ) -> Result<DraftOrderEntry, AppError> {
        let entry = draft_order::require_owned_entry(self.db(), draft_id, user_id).await?;
        let roster_id = entry.roster_id;
        let keys = [draft_lock(draft_id)?, roster_lock(roster_id)?];

        self.runner
            .run_with_locks(keys, move |txn| {
                Box::pin(async move {
                    let draft = drafts::require_draft(txn, draft_id).await?;
                    if draft.status == DraftStatus::Completed {
                        return Err(invalid_state(&draft, "change autodraft").into());
                    }
                    draft_order::set_autodraft(txn, draft_id, roster_id, enabled).await?;
                    Ok(draft_order::require_entry(txn, draft_id, roster_id).await?)
                })
            })
            .await
    }

    /// Caller's queue, front to back. Players drafted since they were queued
    /// are pruned on the way out.
    pub async fn queue_list(&self, draft_id: i64, user_id: i64) -> Result<Vec<QueueEntry>, AppError> {
        drafts::require_draft(self.db(), draft_id).await?;
        let entry = draft_order::require_owned_entry(self.db(), draft_id, user_id).await?;
        let roster_id = entry.roster_id;
        let keys = [draft_lock(draft_id)?, roster_lock(roster_id)?];

        let (queue, pruned) = self
            .runner
            .run_with_locks(keys, move |txn| {
                Box::pin(async move {
                    let pruned = draft_queue::prune_drafted(txn, draft_id, roster_id).await?;
                    let queue = draft_queue::list_for_roster(txn, draft_id, roster_id).await?;
                    Ok((queue, pruned))
                })
            })
            .await?;

        if pruned > 0 {
            debug!(draft_id, roster_id, pruned, "Pruned drafted players from queue");
            self.events.emit(DraftEvent::QueueChanged { draft_id, roster_id });
        }
        Ok(queue)
    }

    pub async fn queue_add(
        &self,
        draft_id: i64,
        user_id: i64,
        player_id: i64,
    ) -> Result<Vec<QueueEntry>, AppError> {
        let entry = draft_order::require_owned_entry(self.db(), draft_id, user_id).await?;
        let roster_id = entry.roster_id;
        let keys = [draft_lock(draft_id)?, roster_lock(roster_id)?];

        let queue = self
            .runner
            .run_with_locks(keys, move |txn| {
                Box::pin(async move {
                    let draft = drafts::require_draft(txn, draft_id).await?;
                    if draft.status == DraftStatus::Completed {
                        return Err(invalid_state(&draft, "queue players").into());
                    }
                    players::require_player(txn, player_id).await?;
                    if draft_picks::is_player_drafted(txn, draft_id, player_id).await? {
                        return Err(DomainError::conflict(
                            ConflictKind::PlayerAlreadyDrafted,
                            format!("Player {player_id} has already been drafted"),
                        )
                        .into());
                    }
                    draft_queue::append(txn, draft_id, roster_id, player_id).await?;
                    Ok(draft_queue::list_for_roster(txn, draft_id, roster_id).await?)
                })
            })
            .await?;

        self.events.emit(DraftEvent::QueueChanged { draft_id, roster_id });
        Ok(queue)
    }

    pub async fn queue_remove(&self, draft_id: i64, user_id: i64, player_id: i64) -> Result<(), AppError> {
        let entry = draft_order::require_owned_entry(self.db(), draft_id, user_id).await?;
        let roster_id = entry.roster_id;
        let keys = [draft_lock(draft_id)?, roster_lock(roster_id)?];

        let removed = self
            .runner
            .run_with_locks(keys, move |txn| {
                Box::pin(async move {
                    Ok(draft_queue::remove(txn, draft_id, roster_id, player_id).await?)
                })
            })
            .await?;

        if !removed {
            return Err(AppError::not_found(
                ErrorCode::PlayerNotFound,
                format!("Player {player_id} is not in your queue"),
            ));
        }
        self.events.emit(DraftEvent::QueueChanged { draft_id, roster_id });
        Ok(())
    }

    /// Draft, order and picks. Read outside any lock.
    pub async fn snapshot(&self, draft_id: i64) -> Result<DraftSnapshot, AppError> {
        let draft = drafts::require_draft(self.db(), draft_id).await?;
        let order = draft_order::list(self.db(), draft_id).await?;
        let picks = draft_picks::list_for_draft(self.db(), draft_id).await?;
        Ok(DraftSnapshot { draft, order, picks })
    }
}

fn draft_lock(draft_id: i64) -> Result<LockKey, AppError> {
    Ok(LockKey::try_new(LockDomain::Draft, draft_id)?)
}

fn roster_lock(roster_id: i64) -> Result<LockKey, AppError> {
    Ok(LockKey::try_new(LockDomain::Roster, roster_id)?)
}

async fn tick_locked<C: ConnectionTrait + Send + Sync>(
    txn: &C,
    draft_id: i64,
    now: OffsetDateTime,
    events: &mut Vec<DraftEvent>,
) -> Result<TickOutcome, DomainError> {
    let Some(draft) = drafts::find_by_id(txn, draft_id).await? else {
        return Ok(TickOutcome::Idle);
    };
    if draft.status != DraftStatus::InProgress {
        return Ok(TickOutcome::Idle);
    }
    let order = draft_order::list(txn, draft_id).await?;

    // A previous run wrote the pick but never moved the pointer.
    if draft_picks::find_by_pick_number(txn, draft_id, draft.current_pick)
        .await?
        .is_some()
    {
        warn!(draft_id, pick_number = draft.current_pick, "Current pick already exists; repairing pointer");
        let advanced = advance(txn, &draft, &order, now, events).await?;
        return Ok(if advanced.status == DraftStatus::Completed {
            TickOutcome::Completed { pick_number: draft.current_pick }
        } else {
            TickOutcome::Recovered { pick_number: draft.current_pick }
        });
    }

    let picker = current_picker(&draft, &order)?;
    let deadline_passed = draft.pick_deadline.is_some_and(|deadline| deadline <= now);
    if !deadline_passed && !picker.autodraft_enabled {
        return Ok(TickOutcome::Idle);
    }

    let pick = autopick(txn, &draft, &order, picker, events).await?;

    if !picker.autodraft_enabled {
        draft_order::set_autodraft(txn, draft_id, picker.roster_id, true).await?;
        info!(draft_id, roster_id = picker.roster_id, "Pick timed out; autodraft forced on");
        events.push(DraftEvent::AutodraftForced {
            draft_id,
            roster_id: picker.roster_id,
        });
    }

    let advanced = advance(txn, &draft, &order, now, events).await?;
    Ok(if advanced.status == DraftStatus::Completed {
        TickOutcome::Completed { pick_number: pick.pick_number }
    } else {
        TickOutcome::Picked {
            pick_number: pick.pick_number,
            player_id: pick.player_id,
        }
    })
}

/// Choose from the picker's queue, else best available, and write the pick.
async fn autopick<C: ConnectionTrait + Send + Sync>(
    txn: &C,
    draft: &Draft,
    order: &[DraftOrderEntry],
    picker: &DraftOrderEntry,
    events: &mut Vec<DraftEvent>,
) -> Result<DraftPick, DomainError> {
    let draft_id = draft.id;
    let slot = current_slot(draft, order)?;

    let queue = draft_queue::list_for_roster(txn, draft_id, picker.roster_id).await?;
    let mut consumed = Vec::new();
    let mut chosen = None;
    for entry in queue {
        consumed.push(entry.id);
        if !draft_picks::is_player_drafted(txn, draft_id, entry.player_id).await? {
            chosen = Some(entry.player_id);
            break;
        }
    }

    let player_id = match chosen {
        Some(player_id) => player_id,
        None => {
            players::best_available(txn, draft_id)
                .await?
                .ok_or_else(|| {
                    DomainError::infra(
                        InfraErrorKind::DataCorruption,
                        format!("No players available to autopick for draft {draft_id}"),
                    )
                })?
                .id
        }
    };

    if draft_queue::delete_entries(txn, &consumed).await? > 0 {
        events.push(DraftEvent::QueueChanged {
            draft_id,
            roster_id: picker.roster_id,
        });
    }

    let inserted = draft_picks::create_pick(
        txn,
        PickCreate {
            draft_id,
            pick_number: slot.pick_number,
            round: slot.round,
            pick_in_round: slot.pick_in_round,
            roster_id: picker.roster_id,
            player_id,
            is_auto_pick: true,
            idempotency_key: Some(autopick_key(draft_id, slot.pick_number)),
        },
    )
    .await?;
    let pick = inserted.pick().clone();

    info!(draft_id, pick_number = pick.pick_number, player_id = pick.player_id, "Autopick made");
    events.push(pick_made_event(&pick));
    Ok(pick)
}

async fn manual_pick_locked<C: ConnectionTrait + Send + Sync>(
    txn: &C,
    draft_id: i64,
    user_id: i64,
    player_id: i64,
    now: OffsetDateTime,
    events: &mut Vec<DraftEvent>,
) -> Result<ManualPick, DomainError> {
    let draft = drafts::require_draft(txn, draft_id).await?;
    if draft.status != DraftStatus::InProgress {
        return Err(invalid_state(&draft, "pick"));
    }
    let order = draft_order::list(txn, draft_id).await?;

    if draft_picks::find_by_pick_number(txn, draft_id, draft.current_pick)
        .await?
        .is_some()
    {
        warn!(draft_id, pick_number = draft.current_pick, "Current pick already exists; repairing pointer");
        advance(txn, &draft, &order, now, events).await?;
        return Ok(ManualPick::Repaired {
            pick_number: draft.current_pick,
        });
    }

    let mine = draft_order::require_owned_entry(txn, draft_id, user_id).await?;
    if draft.current_roster_id != Some(mine.roster_id) {
        return Err(DomainError::validation(
            ValidationKind::OutOfTurn,
            format!("It is not roster {}'s turn to pick", mine.roster_id),
        ));
    }

    players::require_player(txn, player_id).await?;
    if draft_picks::is_player_drafted(txn, draft_id, player_id).await? {
        return Err(DomainError::conflict(
            ConflictKind::PlayerAlreadyDrafted,
            format!("Player {player_id} has already been drafted"),
        ));
    }

    let slot = current_slot(&draft, &order)?;
    let inserted = draft_picks::create_pick(
        txn,
        PickCreate {
            draft_id,
            pick_number: slot.pick_number,
            round: slot.round,
            pick_in_round: slot.pick_in_round,
            roster_id: mine.roster_id,
            player_id,
            is_auto_pick: false,
            idempotency_key: None,
        },
    )
    .await?;
    let pick = inserted.pick().clone();
    events.push(pick_made_event(&pick));

    advance(txn, &draft, &order, now, events).await?;
    Ok(ManualPick::Made(pick))
}

/// Move past `draft.current_pick`, completing the draft after the last pick.
async fn advance<C: ConnectionTrait + Send + Sync>(
    txn: &C,
    draft: &Draft,
    order: &[DraftOrderEntry],
    now: OffsetDateTime,
    events: &mut Vec<DraftEvent>,
) -> Result<Draft, DomainError> {
    let draft_id = draft.id;
    let next = draft.current_pick + 1;
    let strategy = strategy_for(draft.draft_type);

    match slot_for(strategy, next, order.len() as i32, draft.rounds) {
        Some(slot) => {
            let pointer = pointer_for(draft, order, slot, now)?;
            let updated = drafts::advance_pointer(txn, draft_id, draft.current_pick, pointer).await?;
            events.push(next_pick_event(&updated, pointer));
            Ok(updated)
        }
        None => {
            let picks = draft_picks::list_for_draft(txn, draft_id).await?;
            let assignments: Vec<(i64, i64)> =
                picks.iter().map(|p| (p.roster_id, p.player_id)).collect();
            let added = rosters::add_players_ignoring_existing(txn, &assignments, ACQUIRED_VIA_DRAFT).await?;
            let completed = drafts::complete(txn, draft_id, draft.current_pick).await?;
            info!(draft_id, picks = picks.len(), roster_players_added = added, "Draft completed");
            events.push(DraftEvent::DraftCompleted { draft_id });
            Ok(completed)
        }
    }
}

fn pointer_for(
    draft: &Draft,
    order: &[DraftOrderEntry],
    slot: PickSlot,
    now: OffsetDateTime,
) -> Result<PointerUpdate, DomainError> {
    let roster_id = order
        .iter()
        .find(|e| e.draft_position == slot.draft_position)
        .map(|e| e.roster_id)
        .ok_or_else(|| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!(
                    "Draft {} has no roster at position {}",
                    draft.id, slot.draft_position
                ),
            )
        })?;
    Ok(PointerUpdate {
        pick: slot.pick_number,
        round: slot.round,
        roster_id,
        deadline: deadline_from(draft, now),
    })
}

fn deadline_from(draft: &Draft, now: OffsetDateTime) -> OffsetDateTime {
    now + Duration::seconds(i64::from(draft.pick_time_seconds))
}

fn current_slot(draft: &Draft, order: &[DraftOrderEntry]) -> Result<PickSlot, DomainError> {
    slot_for(
        strategy_for(draft.draft_type),
        draft.current_pick,
        order.len() as i32,
        draft.rounds,
    )
    .ok_or_else(|| {
        DomainError::infra(
            InfraErrorKind::DataCorruption,
            format!(
                "Draft {} pointer {} is outside the draft",
                draft.id, draft.current_pick
            ),
        )
    })
}

fn current_picker<'a>(
    draft: &Draft,
    order: &'a [DraftOrderEntry],
) -> Result<&'a DraftOrderEntry, DomainError> {
    draft
        .current_roster_id
        .and_then(|roster_id| order.iter().find(|e| e.roster_id == roster_id))
        .ok_or_else(|| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Draft {} has no current picker in its order", draft.id),
            )
        })
}

async fn require_commissioner<C: ConnectionTrait + Send + Sync>(
    txn: &C,
    draft: &Draft,
    user_id: i64,
) -> Result<(), DomainError> {
    let league = leagues::require_league(txn, draft.league_id).await?;
    if league.commissioner_user_id != user_id {
        return Err(DomainError::forbidden(
            ForbiddenKind::NotCommissioner,
            "Only the league commissioner can do this",
        ));
    }
    Ok(())
}

fn invalid_state(draft: &Draft, action: &str) -> DomainError {
    DomainError::validation(
        ValidationKind::InvalidDraftState,
        format!("Cannot {action} draft {} while it is {:?}", draft.id, draft.status),
    )
}

fn pick_made_event(pick: &DraftPick) -> DraftEvent {
    DraftEvent::PickMade {
        draft_id: pick.draft_id,
        pick_number: pick.pick_number,
        round: pick.round,
        pick_in_round: pick.pick_in_round,
        roster_id: pick.roster_id,
        player_id: pick.player_id,
        is_auto_pick: pick.is_auto_pick,
    }
}

fn next_pick_event(draft: &Draft, pointer: PointerUpdate) -> DraftEvent {
    DraftEvent::NextPick {
        draft_id: draft.id,
        pick_number: pointer.pick,
        round: pointer.round,
        roster_id: pointer.roster_id,
        pick_deadline: Some(pointer.deadline),
    }
}
