use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};

use crate::idempotency::IDEMPOTENCY_HEADER;
use crate::middleware::idempotency::REPLAYED_HEADER;

/// Explicit CORS policy. Falls back to localhost when nothing valid is configured.
pub fn cors_middleware(allowed_origins: &[String]) -> Cors {
    let mut origins: Vec<&str> = allowed_origins
        .iter()
        .map(|s| s.trim())
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .collect();
    if origins.is_empty() {
        origins = vec!["http://localhost:3000", "http://127.0.0.1:3000"];
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(IDEMPOTENCY_HEADER),
        ])
        .expose_headers(vec![
            HeaderName::from_static("x-trace-id"),
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(REPLAYED_HEADER),
        ])
        .max_age(3600);

    for origin in origins {
        cors = cors.allowed_origin(origin);
    }
    cors
}
