use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::idempotency::claims::is_valid_key;
use crate::idempotency::IDEMPOTENCY_HEADER;

/// Required `x-idempotency-key` header for handlers that must be retry safe
/// beyond the HTTP guard. Missing: 428. Malformed: 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey(pub String);

impl FromRequest for IdempotencyKey {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.headers().get(IDEMPOTENCY_HEADER) {
            None => Err(AppError::precondition_required(format!(
                "{IDEMPOTENCY_HEADER} header is required"
            ))),
            Some(value) => match value.to_str() {
                Ok(key) if is_valid_key(key) => Ok(IdempotencyKey(key.to_owned())),
                _ => Err(AppError::bad_request(
                    ErrorCode::InvalidIdempotencyKey,
                    format!("Malformed {IDEMPOTENCY_HEADER} header"),
                )),
            },
        };
        ready(result)
    }
}
