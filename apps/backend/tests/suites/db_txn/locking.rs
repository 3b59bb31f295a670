use std::sync::Arc;
use std::time::Duration;

use backend::db::{JobId, LockDomain, LockKey};
use backend::error::AppError;
use backend::infra::state::build_state;
use backend::repos::leagues;
use backend::test_support::test_state;
use tokio::sync::{oneshot, Barrier};

use crate::support::temp_db::TempSqlite;

/// Read-modify-write through a compare-and-set: any interleaving between the
/// read and the write would make `advance_season` fail.
#[tokio::test]
async fn same_key_sections_never_interleave() -> Result<(), AppError> {
    let temp = TempSqlite::new();
    let state = build_state().with_db(temp.config()).build().await?;
    let league = leagues::create_league(state.db(), "Counter", 2000, 1).await?;
    let key = LockKey::try_new(LockDomain::League, league.id)?;

    let workers = 6;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for _ in 0..workers {
        let runner = state.runner.clone();
        let barrier = Arc::clone(&barrier);
        let league_id = league.id;
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            runner
                .run_with_lock(key, move |txn| {
                    Box::pin(async move {
                        let seen = leagues::require_league(txn, league_id).await?.season;
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok(leagues::advance_season(txn, league_id, seen).await?)
                    })
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("worker panicked")?;
    }

    let league = leagues::require_league(state.db(), league.id).await?;
    assert_eq!(league.season, 2000 + workers as i32);
    Ok(())
}

#[tokio::test]
async fn try_lock_skips_when_held() -> Result<(), AppError> {
    let temp = TempSqlite::new();
    let state = build_state().with_db(temp.config()).build().await?;
    let key = JobId::IdempotencyReaper.lock_key();

    let (held_tx, held_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let holder = {
        let runner = state.runner.clone();
        tokio::spawn(async move {
            runner
                .run_with_lock(key, move |_txn| {
                    Box::pin(async move {
                        let _ = held_tx.send(());
                        let _ = release_rx.await;
                        Ok(())
                    })
                })
                .await
        })
    };
    held_rx.await.expect("holder should report the lock");

    let mut ran = false;
    let skipped = state
        .runner
        .try_run_with_lock(key, |_txn| {
            ran = true;
            Box::pin(async move { Ok(()) })
        })
        .await?;
    assert!(skipped.is_none());
    assert!(!ran, "closure must not run when the lock is held");

    release_tx.send(()).expect("holder still waiting");
    holder.await.expect("holder panicked")?;

    let acquired = state
        .runner
        .try_run_with_lock(key, |_txn| Box::pin(async move { Ok(7) }))
        .await?;
    assert_eq!(acquired, Some(7));
    Ok(())
}

#[tokio::test]
async fn multi_key_sections_accept_any_order() -> Result<(), AppError> {
    let state = test_state().await?;
    let a = LockKey::try_new(LockDomain::Draft, 1)?;
    let b = LockKey::try_new(LockDomain::Roster, 2)?;

    let first = state.runner.run_with_locks([a, b], |_txn| Box::pin(async move { Ok(1) }));
    let second = state.runner.run_with_locks([b, a, b], |_txn| Box::pin(async move { Ok(2) }));
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first?, 1);
    assert_eq!(second?, 2);
    Ok(())
}
