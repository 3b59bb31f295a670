pub mod claims;
pub mod operations;
pub mod reaper;

pub use claims::{ClaimOutcome, StoredResponse, IDEMPOTENCY_HEADER};
pub use operations::{Operation, OperationKind, OperationScope};
