use std::future::Future;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{DraftEvent, DraftEventSink};
use crate::error::AppError;

const PUBLISHER_MAX_ATTEMPTS: u32 = 3;
const PUBLISHER_INITIAL_RETRY_DELAY_MS: u64 = 50;
const PUBLISHER_MAX_RETRY_DELAY_MS: u64 = 200;
/// Events waiting for the publisher. Beyond this, new events are dropped.
const PUBLISHER_BUFFER: usize = 1024;

/// Publishes JSON envelopes on `draft:{id}`.
///
/// One publisher task drains a FIFO channel, so subscribers see events in
/// emit order (`pick_made` before `next_pick` before `draft_completed`).
#[derive(Clone)]
pub struct RedisEventSink {
    tx: mpsc::Sender<DraftEvent>,
}

impl RedisEventSink {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|err| AppError::config(format!("Unable to connect to Redis: {err}")))?;
        Ok(Self::spawn(manager))
    }

    fn spawn<P: Publisher + Send + 'static>(publisher: P) -> Self {
        let (tx, rx) = mpsc::channel(PUBLISHER_BUFFER);
        tokio::spawn(drain(publisher, rx));
        Self { tx }
    }
}

impl DraftEventSink for RedisEventSink {
    fn emit(&self, event: DraftEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(channel = event.channel(), "Publisher backlog full; dropping draft event")
            }
            Err(TrySendError::Closed(event)) => {
                warn!(channel = event.channel(), "Publisher stopped; dropping draft event")
            }
        }
    }
}

trait Publisher {
    fn send(&mut self, channel: &str, payload: &str) -> impl Future<Output = RedisResult<()>> + Send;
}

impl Publisher for ConnectionManager {
    fn send(&mut self, channel: &str, payload: &str) -> impl Future<Output = RedisResult<()>> + Send {
        let mut conn = self.clone();
        let (channel, payload) = (channel.to_owned(), payload.to_owned());
        async move { conn.publish::<_, _, ()>(channel, payload).await }
    }
}

/// Publish events one at a time until every sender is gone.
async fn drain<P: Publisher>(mut publisher: P, mut rx: mpsc::Receiver<DraftEvent>) {
    while let Some(event) = rx.recv().await {
        publish_with_retry(&mut publisher, &event).await;
    }
    debug!("Draft event publisher stopped");
}

async fn publish_with_retry<P: Publisher>(publisher: &mut P, event: &DraftEvent) {
    let channel = event.channel();
    let encoded = match serde_json::to_string(event) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(error = %err, channel, "Failed to serialize draft event");
            return;
        }
    };

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match publisher.send(&channel, &encoded).await {
            Ok(()) => {
                debug!(channel, "Published draft event");
                return;
            }
            Err(err) if attempt < PUBLISHER_MAX_ATTEMPTS && is_transient(&err) => {
                let delay_ms = PUBLISHER_INITIAL_RETRY_DELAY_MS
                    .saturating_mul(2_u64.pow(attempt - 1))
                    .min(PUBLISHER_MAX_RETRY_DELAY_MS);
                warn!(error = %err, attempt, retry_delay_ms = delay_ms, "Redis publish failed, retrying");
                sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(err) => {
                warn!(error = %err, channel, attempt, "Dropping draft event");
                return;
            }
        }
    }
}

fn is_transient(err: &redis::RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_timeout() || err.is_connection_refusal()
}
