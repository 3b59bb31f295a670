use std::path::PathBuf;
use std::time::Duration;

use backend::config::db::{DbConfig, DbKind};
use backend_test_support::unique_helpers::unique_str;

/// File-backed SQLite with several connections, for tests that need two
/// transactions open at once. Removes the file on drop.
pub struct TempSqlite {
    pub path: PathBuf,
}

impl TempSqlite {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("{}.sqlite", unique_str("league-test")));
        Self { path }
    }

    pub fn config(&self) -> DbConfig {
        DbConfig {
            kind: DbKind::SqliteFile,
            url: None,
            sqlite_path: self.path.to_string_lossy().into_owned(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl Drop for TempSqlite {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(p));
        }
    }
}
