use backend::error::AppError;
use backend::repos::draft_picks::{self, PickCreate};
use backend::test_support::{seed_league, test_state, LeagueSeed};

use crate::common::assert_code;
use crate::support::draft_helpers::{load_draft, start};

#[tokio::test]
async fn owner_on_the_clock_can_pick() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;

    let pick = state.engine.make_pick(fx.draft_id, fx.owner(1), fx.players[2]).await?;
    assert_eq!(pick.pick_number, 1);
    assert_eq!(pick.roster_id, fx.roster_id(1));
    assert_eq!(pick.player_id, fx.players[2]);
    assert!(!pick.is_auto_pick);

    let draft = load_draft(state.db(), fx.draft_id).await;
    assert_eq!(draft.current_pick, 2);
    assert_eq!(draft.current_roster_id, Some(fx.roster_id(2)));
    Ok(())
}

#[tokio::test]
async fn manual_pick_rejections() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;

    assert_code(
        state.engine.make_pick(fx.draft_id, fx.owner(2), fx.players[0]).await,
        "OUT_OF_TURN",
    );
    assert_code(
        state.engine.make_pick(fx.draft_id, 999, fx.players[0]).await,
        "NOT_A_ROSTER_OWNER",
    );
    assert_code(
        state.engine.make_pick(fx.draft_id, fx.owner(1), 987_654).await,
        "PLAYER_NOT_FOUND",
    );

    state.engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await?;
    assert_code(
        state.engine.make_pick(fx.draft_id, fx.owner(2), fx.players[0]).await,
        "PLAYER_ALREADY_DRAFTED",
    );

    let picks = draft_picks::list_for_draft(state.db(), fx.draft_id).await?;
    assert_eq!(picks.len(), 1);
    Ok(())
}

#[tokio::test]
async fn picking_before_start_is_invalid() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;

    assert_code(
        state.engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await,
        "INVALID_DRAFT_STATE",
    );
    Ok(())
}

#[tokio::test]
async fn stale_pointer_is_repaired_and_reported() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;

    draft_picks::create_pick(
        state.db(),
        PickCreate {
            draft_id: fx.draft_id,
            pick_number: 1,
            round: 1,
            pick_in_round: 1,
            roster_id: fx.roster_id(1),
            player_id: fx.players[3],
            is_auto_pick: true,
            idempotency_key: None,
        },
    )
    .await?;

    assert_code(
        state.engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await,
        "PICK_ALREADY_MADE",
    );

    // The repair is kept even though the caller got an error.
    let draft = load_draft(state.db(), fx.draft_id).await;
    assert_eq!(draft.current_pick, 2);

    let pick = state.engine.make_pick(fx.draft_id, fx.owner(2), fx.players[0]).await?;
    assert_eq!(pick.pick_number, 2);
    Ok(())
}

#[tokio::test]
async fn autopick_key_replays_the_same_pick() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;

    let create = |player_index: usize| PickCreate {
        draft_id: fx.draft_id,
        pick_number: 1,
        round: 1,
        pick_in_round: 1,
        roster_id: fx.roster_id(1),
        player_id: fx.players[player_index],
        is_auto_pick: true,
        idempotency_key: Some(backend::draft::autopick_key(fx.draft_id, 1)),
    };

    let first = draft_picks::create_pick(state.db(), create(0)).await?;
    let second = draft_picks::create_pick(state.db(), create(1)).await?;
    assert!(matches!(first, draft_picks::PickInsert::Created(_)));
    assert!(matches!(second, draft_picks::PickInsert::Replayed(_)));
    assert_eq!(second.pick().player_id, fx.players[0]);
    Ok(())
}
