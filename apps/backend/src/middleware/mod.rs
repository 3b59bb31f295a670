pub mod cors;
pub mod idempotency;
pub mod jwt_extract;
pub mod request_trace;
pub mod structured_logger;
pub mod trace_span;

pub use cors::cors_middleware;
pub use idempotency::IdempotencyGuard;
pub use jwt_extract::JwtExtract;
pub use request_trace::{RequestTrace, TraceId};
pub use structured_logger::StructuredLogger;
pub use trace_span::TraceSpan;
