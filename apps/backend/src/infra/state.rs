use std::sync::Arc;

use time::Duration;

use crate::config::db::DbConfig;
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::realtime::{DraftEventSink, NullEventSink};
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;

const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::hours(24);

/// Builder for [`AppState`], shared by `main` and the tests.
pub struct StateBuilder {
    security_config: SecurityConfig,
    db_config: Option<DbConfig>,
    idempotency_ttl: Duration,
    events: Option<Arc<dyn DraftEventSink>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            security_config: SecurityConfig::default(),
            db_config: None,
            idempotency_ttl: DEFAULT_IDEMPOTENCY_TTL,
            events: None,
        }
    }

    pub fn with_db(mut self, config: DbConfig) -> Self {
        self.db_config = Some(config);
        self
    }

    pub fn with_security(mut self, security_config: SecurityConfig) -> Self {
        self.security_config = security_config;
        self
    }

    pub fn with_idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.idempotency_ttl = ttl;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn DraftEventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let db_config = self
            .db_config
            .ok_or_else(|| AppError::config("StateBuilder requires a database configuration"))?;
        // single entrypoint: connect + migrate
        let conn = bootstrap_db(&db_config).await?;
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(NullEventSink) as Arc<dyn DraftEventSink>);
        Ok(AppState::new(
            conn,
            self.security_config,
            self.idempotency_ttl,
            events,
        ))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
