//! Periodic cleanup of expired idempotency rows.
//!
//! Every instance runs the loop; the job lock makes sure only one of them
//! does the deletes in a given period. The others skip instead of queueing.

use std::time::Duration;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{JobId, TxnRunner};
use crate::error::AppError;
use crate::idempotency::{claims, operations};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub claims: u64,
    pub operations: u64,
}

/// One reaper pass. `Ok(None)` means another instance holds the job lock.
pub async fn reap_once(
    runner: &TxnRunner,
    now: OffsetDateTime,
) -> Result<Option<ReapReport>, AppError> {
    runner
        .try_run_with_lock(JobId::IdempotencyReaper.lock_key(), |txn| {
            Box::pin(async move {
                let claims = claims::purge_expired(txn, now).await?;
                let operations = operations::purge_expired(txn, now).await?;
                Ok(ReapReport { claims, operations })
            })
        })
        .await
}

pub async fn run_reaper(runner: TxnRunner, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "Idempotency reaper started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match reap_once(&runner, OffsetDateTime::now_utc()).await {
            Ok(Some(report)) => info!(
                claims = report.claims,
                operations = report.operations,
                "Reaped expired idempotency rows"
            ),
            Ok(None) => debug!("Reaper lock held elsewhere; skipping this period"),
            Err(e) => warn!(error = %e, "Idempotency reaper pass failed"),
        }
    }

    info!("Idempotency reaper stopped");
}
