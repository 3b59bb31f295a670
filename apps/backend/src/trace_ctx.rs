//! Request trace id, held in a Tokio task-local.
//!
//! `RequestTrace` opens the scope. Problem Details bodies and storage-error
//! logs read it. Tasks spawned on behalf of a request (claim bookkeeping in
//! the idempotency guard) do not inherit task-locals and wrap their future
//! with [`inherit`].

use std::future::Future;
use std::sync::Arc;

use tokio::task_local;

const NO_TRACE: &str = "unknown";

task_local! {
    static TRACE_ID: Arc<str>;
}

/// The current request's trace id, or `"unknown"` outside a request.
pub fn trace_id() -> String {
    current().map_or_else(|| NO_TRACE.to_owned(), |id| id.to_string())
}

pub fn current() -> Option<Arc<str>> {
    TRACE_ID.try_with(Arc::clone).ok()
}

pub async fn with_trace_id<F>(trace_id: impl Into<Arc<str>>, future: F) -> F::Output
where
    F: Future,
{
    TRACE_ID.scope(trace_id.into(), future).await
}

/// Carry the caller's trace id (if any) into a future that will run on
/// another task.
pub fn inherit<F>(future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let id = current();
    async move {
        match id {
            Some(id) => TRACE_ID.scope(id, future).await,
            None => future.await,
        }
    }
}
