use backend::draft::ticker::tick_all;
use backend::error::AppError;
use backend::repos::draft_picks;
use backend::test_support::{seed_league, test_state, LeagueSeed};

use crate::support::draft_helpers::start;

#[tokio::test]
async fn tick_all_counts_only_drafts_that_moved() -> Result<(), AppError> {
    let state = test_state().await?;
    let quiet = seed_league(state.db(), LeagueSeed::default()).await?;
    let busy = seed_league(state.db(), LeagueSeed::default()).await?;
    let unstarted = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &quiet).await?;
    start(&state.engine, &busy).await?;

    assert_eq!(tick_all(&state.engine, 4).await?, 0);

    state.engine.set_autodraft(busy.draft_id, busy.owner(1), true).await?;
    state.engine.set_autodraft(unstarted.draft_id, unstarted.owner(1), true).await?;
    assert_eq!(tick_all(&state.engine, 4).await?, 1);

    assert_eq!(draft_picks::list_for_draft(state.db(), busy.draft_id).await?.len(), 1);
    assert!(draft_picks::list_for_draft(state.db(), quiet.draft_id).await?.is_empty());
    assert!(draft_picks::list_for_draft(state.db(), unstarted.draft_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn zero_concurrency_still_ticks() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    state.engine.set_autodraft(fx.draft_id, fx.owner(1), true).await?;
    start(&state.engine, &fx).await?;

    assert_eq!(tick_all(&state.engine, 0).await?, 1);
    Ok(())
}
