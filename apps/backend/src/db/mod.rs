pub mod lock_keys;
pub mod locks;
pub mod txn;

pub use lock_keys::{JobId, LockDomain, LockKey, LockKeyError};
pub use txn::{TxnFuture, TxnRunner};
