use backend::db::JobId;
use backend::error::AppError;
use backend::idempotency::claims::{self, NewClaim};
use backend::idempotency::operations::{self, OperationKind, OperationScope};
use backend::idempotency::reaper::{reap_once, ReapReport};
use backend::infra::state::build_state;
use backend::test_support::test_state;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tokio::sync::oneshot;

use crate::support::temp_db::TempSqlite;

async fn seed_rows(state: &backend::AppState, key: &str, ttl: Duration) -> Result<(), AppError> {
    claims::claim(
        state.db(),
        &NewClaim {
            key,
            user_id: 9,
            method: "POST",
            path: "/api/drafts/1/picks",
            ttl,
        },
    )
    .await?;
    let scope = OperationScope::league(OperationKind::SeasonRollover, 1);
    operations::create(state.db(), scope, 9, key, json!({"ok": true}), ttl).await?;
    Ok(())
}

#[tokio::test]
async fn removes_only_expired_rows() -> Result<(), AppError> {
    let state = test_state().await?;
    seed_rows(&state, "short", Duration::hours(1)).await?;
    seed_rows(&state, "long", Duration::hours(48)).await?;

    let later = OffsetDateTime::now_utc() + Duration::hours(2);
    let report = reap_once(&state.runner, later).await?;
    assert_eq!(
        report,
        Some(ReapReport {
            claims: 1,
            operations: 1
        })
    );

    assert!(claims::find(state.db(), "short", 9).await?.is_none());
    assert!(claims::find(state.db(), "long", 9).await?.is_some());
    let scope = OperationScope::league(OperationKind::SeasonRollover, 1);
    assert!(operations::find_by_key(state.db(), scope, 9, "long").await?.is_some());

    let again = reap_once(&state.runner, later).await?;
    assert_eq!(again, Some(ReapReport::default()));
    Ok(())
}

#[tokio::test]
async fn skips_when_another_reaper_holds_the_lock() -> Result<(), AppError> {
    let temp = TempSqlite::new();
    let state = build_state().with_db(temp.config()).build().await?;
    seed_rows(&state, "stale", Duration::minutes(1)).await?;

    let (held_tx, held_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let holder = {
        let runner = state.runner.clone();
        tokio::spawn(async move {
            runner
                .run_with_lock(JobId::IdempotencyReaper.lock_key(), move |_txn| {
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

    let later = OffsetDateTime::now_utc() + Duration::hours(1);
    assert_eq!(reap_once(&state.runner, later).await?, None);
    assert!(claims::find(state.db(), "stale", 9).await?.is_some());

    release_tx.send(()).expect("holder still waiting");
    holder.await.expect("holder panicked")?;

    let report = reap_once(&state.runner, later).await?;
    assert_eq!(report.map(|r| r.claims), Some(1));
    Ok(())
}
