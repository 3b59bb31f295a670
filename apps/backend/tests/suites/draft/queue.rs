use backend::draft::TickOutcome;
use backend::error::AppError;
use backend::repos::draft_queue;
use backend::test_support::{seed_league, test_state, LeagueSeed};
use time::{Duration, OffsetDateTime};

use crate::common::assert_code;
use crate::support::draft_helpers::start;

#[tokio::test]
async fn queue_keeps_insertion_order() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    let engine = &state.engine;

    engine.queue_add(fx.draft_id, fx.owner(1), fx.players[4]).await?;
    engine.queue_add(fx.draft_id, fx.owner(1), fx.players[1]).await?;
    let queue = engine.queue_add(fx.draft_id, fx.owner(1), fx.players[3]).await?;
    let ids: Vec<i64> = queue.iter().map(|q| q.player_id).collect();
    assert_eq!(ids, vec![fx.players[4], fx.players[1], fx.players[3]]);

    engine.queue_remove(fx.draft_id, fx.owner(1), fx.players[1]).await?;
    let ids: Vec<i64> = engine
        .queue_list(fx.draft_id, fx.owner(1))
        .await?
        .iter()
        .map(|q| q.player_id)
        .collect();
    assert_eq!(ids, vec![fx.players[4], fx.players[3]]);

    // Other rosters see only their own queue.
    assert!(engine.queue_list(fx.draft_id, fx.owner(2)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn queue_rejections() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;
    let engine = &state.engine;

    engine.queue_add(fx.draft_id, fx.owner(2), fx.players[2]).await?;
    assert_code(
        engine.queue_add(fx.draft_id, fx.owner(2), fx.players[2]).await,
        "ALREADY_QUEUED",
    );
    assert_code(
        engine.queue_add(fx.draft_id, 999, fx.players[2]).await,
        "NOT_A_ROSTER_OWNER",
    );
    assert_code(
        engine.queue_add(fx.draft_id, fx.owner(2), 555_555).await,
        "PLAYER_NOT_FOUND",
    );
    assert_code(
        engine.queue_remove(fx.draft_id, fx.owner(2), fx.players[5]).await,
        "PLAYER_NOT_FOUND",
    );

    engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await?;
    assert_code(
        engine.queue_add(fx.draft_id, fx.owner(2), fx.players[0]).await,
        "PLAYER_ALREADY_DRAFTED",
    );
    Ok(())
}

#[tokio::test]
async fn autopick_skips_drafted_queue_entries() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    let engine = &state.engine;

    engine.queue_add(fx.draft_id, fx.owner(2), fx.players[0]).await?;
    engine.queue_add(fx.draft_id, fx.owner(2), fx.players[4]).await?;
    engine.queue_add(fx.draft_id, fx.owner(2), fx.players[5]).await?;
    start(engine, &fx).await?;

    engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await?;

    let later = OffsetDateTime::now_utc() + Duration::minutes(5);
    let outcome = engine.tick_at(fx.draft_id, later).await?;
    assert_eq!(
        outcome,
        TickOutcome::Picked {
            pick_number: 2,
            player_id: fx.players[4]
        }
    );

    // The drafted entry and the chosen one are both consumed.
    let remaining: Vec<i64> = engine
        .queue_list(fx.draft_id, fx.owner(2))
        .await?
        .iter()
        .map(|q| q.player_id)
        .collect();
    assert_eq!(remaining, vec![fx.players[5]]);
    Ok(())
}

#[tokio::test]
async fn exhausted_queue_falls_back_to_best_available() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    let engine = &state.engine;

    engine.queue_add(fx.draft_id, fx.owner(2), fx.players[0]).await?;
    start(engine, &fx).await?;
    engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await?;

    let later = OffsetDateTime::now_utc() + Duration::minutes(5);
    let outcome = engine.tick_at(fx.draft_id, later).await?;
    assert_eq!(
        outcome,
        TickOutcome::Picked {
            pick_number: 2,
            player_id: fx.players[1]
        }
    );
    assert!(engine.queue_list(fx.draft_id, fx.owner(2)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn reading_the_queue_prunes_drafted_players() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    let engine = &state.engine;

    engine.queue_add(fx.draft_id, fx.owner(2), fx.players[0]).await?;
    engine.queue_add(fx.draft_id, fx.owner(2), fx.players[2]).await?;
    start(engine, &fx).await?;
    engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await?;

    let ids: Vec<i64> = engine
        .queue_list(fx.draft_id, fx.owner(2))
        .await?
        .iter()
        .map(|q| q.player_id)
        .collect();
    assert_eq!(ids, vec![fx.players[2]]);

    // The pruned row is gone for good, not just hidden.
    let stored = draft_queue::list_for_roster(state.db(), fx.draft_id, fx.roster_id(2)).await?;
    assert_eq!(stored.len(), 1);
    Ok(())
}
