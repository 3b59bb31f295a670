use std::sync::Arc;

use sea_orm::DatabaseConnection;
use time::Duration;

use super::security_config::SecurityConfig;
use crate::db::TxnRunner;
use crate::draft::DraftEngine;
use crate::realtime::DraftEventSink;
use crate::services::seasons::SeasonService;

/// Shared handles for request handlers and background jobs.
///
/// Everything here is cheap to clone; handlers receive it as
/// `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub runner: TxnRunner,
    pub security: SecurityConfig,
    /// Lifetime of HTTP claims and operation records.
    pub idempotency_ttl: Duration,
    pub events: Arc<dyn DraftEventSink>,
    pub engine: DraftEngine,
    pub seasons: SeasonService,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        security: SecurityConfig,
        idempotency_ttl: Duration,
        events: Arc<dyn DraftEventSink>,
    ) -> Self {
        let runner = TxnRunner::new(db);
        Self {
            engine: DraftEngine::new(runner.clone(), Arc::clone(&events)),
            seasons: SeasonService::new(runner.clone(), idempotency_ttl),
            runner,
            security,
            idempotency_ttl,
            events,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.runner.db()
    }
}
