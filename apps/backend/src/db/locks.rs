//! Transaction-scoped advisory locks.
//!
//! On Postgres the lock is the server-side `pg_advisory_xact_lock`, released by
//! the server at commit or rollback. SQLite has no advisory locks, so the
//! in-process backend keeps one async mutex per key and hands out a guard the
//! transaction runner drops right after commit/rollback.

use std::sync::Arc;

use dashmap::DashMap;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseTransaction, DbErr, Statement};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::lock_keys::LockKey;

#[derive(Clone)]
pub enum AdvisoryLocks {
    Postgres,
    InProcess(Arc<KeyedMutexes>),
}

impl AdvisoryLocks {
    pub fn for_backend(backend: DatabaseBackend) -> Self {
        match backend {
            DatabaseBackend::Postgres => AdvisoryLocks::Postgres,
            _ => AdvisoryLocks::InProcess(Arc::new(KeyedMutexes::default())),
        }
    }

    /// Block until `key` is held by `txn`.
    pub async fn acquire(&self, txn: &DatabaseTransaction, key: LockKey) -> Result<HeldLock, DbErr> {
        match self {
            AdvisoryLocks::Postgres => {
                txn.execute(Statement::from_sql_and_values(
                    DatabaseBackend::Postgres,
                    "SELECT pg_advisory_xact_lock($1)",
                    vec![key.value().into()],
                ))
                .await?;
                Ok(HeldLock::Server)
            }
            AdvisoryLocks::InProcess(mutexes) => Ok(mutexes.lock(key).await),
        }
    }

    /// Non-blocking variant; `None` when another transaction holds `key`.
    pub async fn try_acquire(
        &self,
        txn: &DatabaseTransaction,
        key: LockKey,
    ) -> Result<Option<HeldLock>, DbErr> {
        match self {
            AdvisoryLocks::Postgres => {
                let row = txn
                    .query_one(Statement::from_sql_and_values(
                        DatabaseBackend::Postgres,
                        "SELECT pg_try_advisory_xact_lock($1) AS locked",
                        vec![key.value().into()],
                    ))
                    .await?
                    .ok_or_else(|| {
                        DbErr::Custom("pg_try_advisory_xact_lock returned no row".to_string())
                    })?;
                let locked: bool = row.try_get("", "locked")?;
                Ok(locked.then_some(HeldLock::Server))
            }
            AdvisoryLocks::InProcess(mutexes) => Ok(mutexes.try_lock(key)),
        }
    }
}

/// Proof that a lock is held for the current transaction.
pub enum HeldLock {
    /// Released by the database at transaction end.
    Server,
    Local(LocalGuard),
}

pub struct LocalGuard {
    key: LockKey,
    owner: Arc<KeyedMutexes>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LocalGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.owner.prune(self.key);
    }
}

#[derive(Default)]
pub struct KeyedMutexes {
    slots: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl KeyedMutexes {
    fn slot(&self, key: LockKey) -> Arc<Mutex<()>> {
        self.slots.entry(key).or_default().clone()
    }

    async fn lock(self: &Arc<Self>, key: LockKey) -> HeldLock {
        let guard = self.slot(key).lock_owned().await;
        HeldLock::Local(LocalGuard {
            key,
            owner: Arc::clone(self),
            guard: Some(guard),
        })
    }

    fn try_lock(self: &Arc<Self>, key: LockKey) -> Option<HeldLock> {
        let guard = self.slot(key).try_lock_owned().ok()?;
        Some(HeldLock::Local(LocalGuard {
            key,
            owner: Arc::clone(self),
            guard: Some(guard),
        }))
    }

    /// Drop the slot once nobody holds or waits on it.
    fn prune(&self, key: LockKey) {
        self.slots
            .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
