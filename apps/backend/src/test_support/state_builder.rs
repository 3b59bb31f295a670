use std::sync::Arc;
use std::time::SystemTime;

use crate::auth::jwt::mint_access_token;
use crate::config::db::DbConfig;
use crate::error::AppError;
use crate::infra::state::build_state;
use crate::realtime::DraftEventSink;
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;

pub const TEST_JWT_SECRET: &[u8] = b"test_secret_key_for_testing_purposes_only";

/// Fresh migrated in-memory database with the null event sink.
pub async fn test_state() -> Result<AppState, AppError> {
    build_state()
        .with_db(DbConfig::sqlite_memory())
        .with_security(SecurityConfig::new(TEST_JWT_SECRET))
        .build()
        .await
}

pub async fn test_state_with_events(events: Arc<dyn DraftEventSink>) -> Result<AppState, AppError> {
    build_state()
        .with_db(DbConfig::sqlite_memory())
        .with_security(SecurityConfig::new(TEST_JWT_SECRET))
        .with_events(events)
        .build()
        .await
}

/// `Authorization` header value for `user_id`.
pub fn bearer_for(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let token = mint_access_token(user_id, SystemTime::now(), &state.security)?;
    Ok(format!("Bearer {token}"))
}
