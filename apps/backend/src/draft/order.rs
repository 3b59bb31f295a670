//! Pick arithmetic and per-draft-type picker order.

use crate::entities::drafts::DraftType;

/// Resolves which draft position picks at a given slot of a round.
pub trait PickOrderStrategy: Send + Sync {
    /// 1-based draft position for `pick_in_round` (1-based) of `round` (1-based).
    fn position(&self, round: i32, pick_in_round: i32, total_rosters: i32) -> i32;
}

/// Direction reverses every round.
pub struct Snake;

/// Same order every round.
pub struct Linear;

/// Auction drafts rotate nominations in a fixed order.
pub struct AuctionNomination;

impl PickOrderStrategy for Snake {
    fn position(&self, round: i32, pick_in_round: i32, total_rosters: i32) -> i32 {
        if round % 2 == 1 {
            pick_in_round
        } else {
            total_rosters - pick_in_round + 1
        }
    }
}

impl PickOrderStrategy for Linear {
    fn position(&self, _round: i32, pick_in_round: i32, _total_rosters: i32) -> i32 {
        pick_in_round
    }
}

impl PickOrderStrategy for AuctionNomination {
    fn position(&self, _round: i32, pick_in_round: i32, _total_rosters: i32) -> i32 {
        pick_in_round
    }
}

pub fn strategy_for(draft_type: DraftType) -> &'static dyn PickOrderStrategy {
    match draft_type {
        DraftType::Snake => &Snake,
        DraftType::Linear => &Linear,
        DraftType::Auction => &AuctionNomination,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickSlot {
    pub pick_number: i32,
    pub round: i32,
    pub pick_in_round: i32,
    pub draft_position: i32,
}

pub fn total_picks(total_rosters: i32, rounds: i32) -> i32 {
    total_rosters.saturating_mul(rounds)
}

/// `ceil(pick / total_rosters)`.
pub fn round_for(pick_number: i32, total_rosters: i32) -> i32 {
    (pick_number + total_rosters - 1) / total_rosters
}

/// Slot for `pick_number`, or `None` once the draft is past its last pick.
pub fn slot_for(
    strategy: &dyn PickOrderStrategy,
    pick_number: i32,
    total_rosters: i32,
    rounds: i32,
) -> Option<PickSlot> {
    if total_rosters <= 0 || pick_number < 1 || pick_number > total_picks(total_rosters, rounds) {
        return None;
    }
    let round = round_for(pick_number, total_rosters);
    let pick_in_round = pick_number - (round - 1) * total_rosters;
    Some(PickSlot {
        pick_number,
        round,
        pick_in_round,
        draft_position: strategy.position(round, pick_in_round, total_rosters),
    })
}
