use std::str::FromStr;
use std::time::Duration;

use super::{must_var, parse_var};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    Postgres,
    /// One shared in-memory connection; every connection would otherwise be
    /// its own empty database.
    SqliteMemory,
    SqliteFile,
}

impl DbKind {
    pub fn is_sqlite(self) -> bool {
        matches!(self, DbKind::SqliteMemory | DbKind::SqliteFile)
    }
}

impl FromStr for DbKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(DbKind::Postgres),
            "sqlite-memory" => Ok(DbKind::SqliteMemory),
            "sqlite-file" => Ok(DbKind::SqliteFile),
            other => Err(AppError::config(format!(
                "DB_KIND must be postgres, sqlite-memory or sqlite-file, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    pub kind: DbKind,
    /// Postgres URL; unused for SQLite.
    pub url: Option<String>,
    pub sqlite_path: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn sqlite_memory() -> Self {
        Self {
            kind: DbKind::SqliteMemory,
            url: None,
            sqlite_path: String::new(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let kind: DbKind = parse_var("DB_KIND", DbKind::Postgres)?;
        let url = match kind {
            DbKind::Postgres => Some(must_var("DATABASE_URL")?),
            _ => None,
        };
        Ok(Self {
            kind,
            url,
            sqlite_path: std::env::var("SQLITE_PATH").unwrap_or_else(|_| "league.sqlite".to_string()),
            max_connections: parse_var("DB_MAX_CONNECTIONS", 16u32)?,
            acquire_timeout: Duration::from_millis(parse_var("DB_ACQUIRE_TIMEOUT_MS", 5000u64)?),
        })
    }

    /// Connection URL for the configured backend.
    pub fn connect_url(&self) -> Result<String, AppError> {
        match self.kind {
            DbKind::Postgres => self
                .url
                .clone()
                .ok_or_else(|| AppError::config("DATABASE_URL is required for postgres")),
            DbKind::SqliteMemory => Ok("sqlite::memory:".to_string()),
            DbKind::SqliteFile => Ok(format!("sqlite://{}?mode=rwc", self.sqlite_path)),
        }
    }

    /// Pool size actually used; in-memory SQLite is always a single connection.
    pub fn pool_size(&self) -> u32 {
        match self.kind {
            DbKind::SqliteMemory => 1,
            _ => self.max_connections.max(1),
        }
    }
}
