//! Background loop that ticks every in-progress draft.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::draft::engine::{DraftEngine, TickOutcome};
use crate::error::AppError;
use crate::repos::drafts;

/// Tick each in-progress draft once with at most `concurrency` in flight.
/// Returns how many drafts changed.
pub async fn tick_all(engine: &DraftEngine, concurrency: usize) -> Result<usize, AppError> {
    // Read outside any lock; a draft that finished meanwhile ticks as Idle.
    let ids = drafts::list_in_progress_ids(engine.db()).await?;

    let changed = stream::iter(ids)
        .map(|draft_id| async move {
            match engine.tick(draft_id).await {
                Ok(TickOutcome::Idle) => false,
                Ok(_) => true,
                Err(e) => {
                    warn!(draft_id, error = %e, "Draft tick failed");
                    false
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .filter(|changed| std::future::ready(*changed))
        .count()
        .await;

    Ok(changed)
}

pub async fn run_ticker(
    engine: DraftEngine,
    interval: Duration,
    concurrency: usize,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(interval_ms = interval.as_millis() as u64, concurrency, "Draft ticker started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match tick_all(&engine, concurrency).await {
            Ok(0) => {}
            Ok(changed) => debug!(changed, "Draft ticker pass"),
            Err(e) => warn!(error = %e, "Draft ticker could not list drafts"),
        }
    }

    info!("Draft ticker stopped");
}
