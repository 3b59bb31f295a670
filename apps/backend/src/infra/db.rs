//! Pool construction and schema bootstrap.

use std::time::Duration;

use migration::{migrate, MigrationCommand};
use sea_orm::{DatabaseConnection, SqlxPostgresConnector, SqlxSqliteConnector};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};

use crate::config::db::{DbConfig, DbKind};
use crate::error::AppError;

const PG_CONNECT_ATTEMPTS: u32 = 5;
const PG_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Build a connection pool for `cfg`. Does not touch the schema.
pub async fn connect_db(cfg: &DbConfig) -> Result<DatabaseConnection, AppError> {
    let url = cfg.connect_url()?;
    match cfg.kind {
        DbKind::SqliteMemory | DbKind::SqliteFile => {
            let mut opts = SqlitePoolOptions::new()
                .max_connections(cfg.pool_size())
                .acquire_timeout(cfg.acquire_timeout)
                .after_connect(|conn, _meta| {
                    Box::pin(async move {
                        sqlx::query("PRAGMA foreign_keys = ON;")
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA busy_timeout = 5000;")
                            .execute(&mut *conn)
                            .await?;
                        Ok::<_, sqlx::Error>(())
                    })
                });
            if cfg.kind == DbKind::SqliteMemory {
                // Closing the only connection would drop the database.
                opts = opts.min_connections(1).idle_timeout(None).max_lifetime(None);
            }
            let pool = opts
                .connect(&url)
                .await
                .map_err(|e| AppError::db_unavailable(format!("sqlite connect failed: {e}")))?;
            info!(engine = "sqlite", kind = ?cfg.kind, max = cfg.pool_size(), "pool=create");
            Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
        }
        DbKind::Postgres => {
            let mut attempt = 1;
            let pool = loop {
                let result = PgPoolOptions::new()
                    .max_connections(cfg.pool_size())
                    .acquire_timeout(cfg.acquire_timeout)
                    .idle_timeout(Duration::from_secs(30))
                    .after_connect(|conn, _meta| {
                        Box::pin(async move {
                            sqlx::query("SET timezone = 'UTC';")
                                .execute(&mut *conn)
                                .await?;
                            Ok::<_, sqlx::Error>(())
                        })
                    })
                    .connect(&url)
                    .await;
                match result {
                    Ok(pool) => break pool,
                    Err(e) if attempt < PG_CONNECT_ATTEMPTS => {
                        warn!(attempt, max_attempts = PG_CONNECT_ATTEMPTS, error = %e, "connection_retry=failed");
                        attempt += 1;
                        tokio::time::sleep(PG_RETRY_INTERVAL).await;
                    }
                    Err(e) => {
                        return Err(AppError::db_unavailable(format!(
                            "postgres connect failed after {attempt} attempts: {e}"
                        )))
                    }
                }
            };
            info!(engine = "postgres", max = cfg.pool_size(), "pool=create");
            Ok(SqlxPostgresConnector::from_sqlx_postgres_pool(pool))
        }
    }
}

/// Connect and bring the schema up to date. The single entrypoint used by
/// both the server and tests.
pub async fn bootstrap_db(cfg: &DbConfig) -> Result<DatabaseConnection, AppError> {
    let db = connect_db(cfg).await?;
    migrate(&db, MigrationCommand::Up)
        .await
        .map_err(|e| AppError::config(format!("migrations failed: {e}")))?;
    Ok(db)
}
