//! The transaction runner: the only place that opens, commits and rolls back
//! database transactions.
//!
//! Every mutation runs as `begin -> lock(s) -> f(txn) -> commit | rollback`.
//! Locks are transaction scoped and are never released manually.

use std::future::Future;
use std::pin::Pin;

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{debug, warn};

use crate::db::lock_keys::{LockKey, LockKeyError};
use crate::db::locks::{AdvisoryLocks, HeldLock};
use crate::error::AppError;
use crate::errors::ErrorCode;

/// Boxed future returned by transaction callbacks; borrows the transaction.
pub type TxnFuture<'t, R> = Pin<Box<dyn Future<Output = Result<R, AppError>> + Send + 't>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LockMode {
    Blocking,
    Try,
}

#[derive(Clone)]
pub struct TxnRunner {
    db: DatabaseConnection,
    locks: AdvisoryLocks,
}

impl TxnRunner {
    pub fn new(db: DatabaseConnection) -> Self {
        let locks = AdvisoryLocks::for_backend(db.get_database_backend());
        Self { db, locks }
    }

    /// Connection for reads outside any lock. Callers must tolerate stale data.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Run `f` in a transaction without taking any lock.
    pub async fn run<R, F>(&self, f: F) -> Result<R, AppError>
    where
        F: for<'t> FnOnce(&'t DatabaseTransaction) -> TxnFuture<'t, R> + Send,
        R: Send,
    {
        blocking_result(self.execute(Vec::new(), LockMode::Blocking, f).await?)
    }

    /// Run `f` while holding the advisory lock for `key`, waiting for it if needed.
    pub async fn run_with_lock<R, F>(&self, key: LockKey, f: F) -> Result<R, AppError>
    where
        F: for<'t> FnOnce(&'t DatabaseTransaction) -> TxnFuture<'t, R> + Send,
        R: Send,
    {
        self.run_with_locks([key], f).await
    }

    /// Run `f` while holding every lock in `keys`.
    ///
    /// Keys are sorted and deduplicated before acquisition so two callers
    /// asking for overlapping sets can never deadlock on ordering.
    pub async fn run_with_locks<R, F, I>(&self, keys: I, f: F) -> Result<R, AppError>
    where
        F: for<'t> FnOnce(&'t DatabaseTransaction) -> TxnFuture<'t, R> + Send,
        R: Send,
        I: IntoIterator<Item = LockKey>,
    {
        let keys = canonical_order(keys);
        blocking_result(self.execute(keys, LockMode::Blocking, f).await?)
    }

    /// Non-blocking variant for opportunistic background work.
    ///
    /// Returns `Ok(None)` without invoking `f` when `key` is held elsewhere.
    pub async fn try_run_with_lock<R, F>(&self, key: LockKey, f: F) -> Result<Option<R>, AppError>
    where
        F: for<'t> FnOnce(&'t DatabaseTransaction) -> TxnFuture<'t, R> + Send,
        R: Send,
    {
        self.execute(vec![key], LockMode::Try, f).await
    }

    async fn execute<R, F>(
        &self,
        keys: Vec<LockKey>,
        mode: LockMode,
        f: F,
    ) -> Result<Option<R>, AppError>
    where
        F: for<'t> FnOnce(&'t DatabaseTransaction) -> TxnFuture<'t, R> + Send,
        R: Send,
    {
        let txn = self.db.begin().await?;
        let mut held: Vec<HeldLock> = Vec::with_capacity(keys.len());

        for key in &keys {
            let acquired = match mode {
                LockMode::Blocking => self.locks.acquire(&txn, *key).await.map(Some),
                LockMode::Try => self.locks.try_acquire(&txn, *key).await,
            };
            match acquired {
                Ok(Some(lock)) => held.push(lock),
                Ok(None) => {
                    debug!(lock_key = %key, "Lock held elsewhere; skipping");
                    rollback_quietly(txn).await;
                    return Ok(None);
                }
                Err(e) => {
                    rollback_quietly(txn).await;
                    return Err(e.into());
                }
            }
        }

        if !keys.is_empty() {
            debug!(locks = ?keys.iter().map(ToString::to_string).collect::<Vec<_>>(), "Locks acquired");
        }

        let outcome = f(&txn).await;
        let result = match outcome {
            Ok(value) => txn.commit().await.map(|_| Some(value)).map_err(AppError::from),
            Err(err) => {
                rollback_quietly(txn).await;
                Err(err)
            }
        };

        // In-process guards must outlive commit/rollback.
        drop(held);
        result
    }
}

fn blocking_result<R>(out: Option<R>) -> Result<R, AppError> {
    out.ok_or_else(|| {
        AppError::internal(
            ErrorCode::Internal,
            "blocking lock acquisition returned without the lock",
        )
    })
}

async fn rollback_quietly(txn: DatabaseTransaction) {
    if let Err(e) = txn.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
}

fn canonical_order<I: IntoIterator<Item = LockKey>>(keys: I) -> Vec<LockKey> {
    let mut keys: Vec<LockKey> = keys.into_iter().collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

impl From<LockKeyError> for AppError {
    fn from(e: LockKeyError) -> Self {
        AppError::bad_request(ErrorCode::InvalidId, e.to_string())
    }
}
