use std::sync::Arc;

use backend::error::AppError;
use backend::idempotency::operations::{self, OperationKind, OperationScope};
use backend::infra::state::build_state;
use backend::repos::{draft_order, drafts, leagues};
use backend::services::RolloverResult;
use backend::test_support::{seed_league, test_state, LeagueSeed};
use serde_json::json;
use time::Duration;
use tokio::sync::Barrier;

use crate::common::assert_code;
use crate::support::draft_helpers::start;
use crate::support::temp_db::TempSqlite;

#[tokio::test]
async fn create_keeps_the_first_response() -> Result<(), AppError> {
    let state = test_state().await?;
    let scope = OperationScope::league(OperationKind::SeasonRollover, 7);

    let first = operations::create(state.db(), scope, 5, "op-1", json!({"n": 1}), Duration::hours(1)).await?;
    let second = operations::create(state.db(), scope, 5, "op-1", json!({"n": 2}), Duration::hours(1)).await?;
    assert_eq!(first.id, second.id);
    assert_eq!(second.response, json!({"n": 1}));

    let found = operations::find_by_key(state.db(), scope, 5, "op-1").await?;
    assert_eq!(found.map(|op| op.response), Some(json!({"n": 1})));

    // Keys are per user.
    assert!(operations::find_by_key(state.db(), scope, 6, "op-1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn key_stays_bound_to_its_first_league() -> Result<(), AppError> {
    let state = test_state().await?;
    let league_a = OperationScope::league(OperationKind::SeasonRollover, 7);
    let league_b = OperationScope::league(OperationKind::SeasonRollover, 8);

    operations::create(state.db(), league_a, 5, "op-2", json!({"n": 1}), Duration::hours(1)).await?;

    let lookup = operations::find_by_key(state.db(), league_b, 5, "op-2").await.map_err(AppError::from);
    assert_code(lookup, "IDEMPOTENCY_KEY_REUSED");
    let stored = operations::create(state.db(), league_b, 5, "op-2", json!({"n": 2}), Duration::hours(1)).await.map_err(AppError::from);
    assert_code(stored, "IDEMPOTENCY_KEY_REUSED");
    Ok(())
}

#[tokio::test]
async fn rollover_advances_season_and_seeds_next_draft() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;

    let rollover = state
        .seasons
        .rollover_season(fx.league_id, fx.commissioner_id, "roll-1")
        .await?;
    assert!(!rollover.replayed);
    let result: RolloverResult = serde_json::from_value(rollover.response.clone())
        .expect("rollover response decodes");
    assert_eq!(result.league_id, fx.league_id);
    assert_eq!(result.season, fx.season + 1);

    let draft = drafts::require_draft(state.db(), result.draft_id).await?;
    assert_eq!(draft.season, fx.season + 1);
    assert_eq!(draft.rounds, 2, "settings copied from the previous draft");
    let order = draft_order::list(state.db(), result.draft_id).await?;
    assert_eq!(order.len(), fx.rosters.len());

    let again = state
        .seasons
        .rollover_season(fx.league_id, fx.commissioner_id, "roll-1")
        .await?;
    assert!(again.replayed);
    assert_eq!(again.response, rollover.response);

    let league = leagues::require_league(state.db(), fx.league_id).await?;
    assert_eq!(league.season, fx.season + 1, "replay must not advance again");
    Ok(())
}

#[tokio::test]
async fn rollover_key_reused_on_another_league_is_rejected() -> Result<(), AppError> {
    let state = test_state().await?;
    let first = seed_league(state.db(), LeagueSeed::default()).await?;
    let second = seed_league(state.db(), LeagueSeed::default()).await?;
    assert_eq!(first.commissioner_id, second.commissioner_id);

    state
        .seasons
        .rollover_season(first.league_id, first.commissioner_id, "same-key")
        .await?;

    for _ in 0..2 {
        let result = state
            .seasons
            .rollover_season(second.league_id, second.commissioner_id, "same-key")
            .await;
        assert_code(result, "IDEMPOTENCY_KEY_REUSED");
    }

    let untouched = leagues::require_league(state.db(), second.league_id).await?;
    assert_eq!(untouched.season, second.season);
    let advanced = leagues::require_league(state.db(), first.league_id).await?;
    assert_eq!(advanced.season, first.season + 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_rollovers_with_one_key_apply_once() -> Result<(), AppError> {
    let temp = TempSqlite::new();
    let state = build_state().with_db(temp.config()).build().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for _ in 0..workers {
        let seasons = state.seasons.clone();
        let barrier = Arc::clone(&barrier);
        let (league_id, user_id) = (fx.league_id, fx.commissioner_id);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            seasons.rollover_season(league_id, user_id, "roll-race").await
        }));
    }

    let mut responses = Vec::new();
    for handle in handles {
        responses.push(handle.await.expect("worker panicked")?);
    }
    assert_eq!(responses.iter().filter(|r| !r.replayed).count(), 1);
    assert!(responses.windows(2).all(|w| w[0].response == w[1].response));

    let league = leagues::require_league(state.db(), fx.league_id).await?;
    assert_eq!(league.season, fx.season + 1);
    Ok(())
}

#[tokio::test]
async fn rollover_refuses_while_draft_runs() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;

    let result = state
        .seasons
        .rollover_season(fx.league_id, fx.commissioner_id, "roll-busy")
        .await;
    assert_code(result, "DRAFT_IN_PROGRESS");

    // A failed attempt stores nothing, so the key stays usable.
    let scope = OperationScope::league(OperationKind::SeasonRollover, fx.league_id);
    let stored = operations::find_by_key(state.db(), scope, fx.commissioner_id, "roll-busy").await?;
    assert!(stored.is_none());
    Ok(())
}

#[tokio::test]
async fn rollover_is_commissioner_only() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;

    let result = state
        .seasons
        .rollover_season(fx.league_id, fx.owner(1), "roll-owner")
        .await;
    assert_code(result, "NOT_COMMISSIONER");

    let league = leagues::require_league(state.db(), fx.league_id).await?;
    assert_eq!(league.season, fx.season);
    Ok(())
}
