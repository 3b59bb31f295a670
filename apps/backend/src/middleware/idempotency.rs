//! HTTP-layer idempotency guard.
//!
//! For mutating requests that carry `x-idempotency-key` from an authenticated
//! user, the first request claims the key and runs the handler; its response
//! is captured into the claim row. Later requests with the same key replay
//! that response, or get 409 while the first is still running.
//!
//! The guard must sit inside `JwtExtract` so the caller is known.
//!
//! Storage errors while claiming never block the request: it runs without
//! the guarantee and a warning is logged.

use std::rc::Rc;

use actix_web::body::{self, BoxBody, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::http::{Method, StatusCode};
use actix_web::{web, Error, HttpMessage, HttpResponse};
use bytes::Bytes;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::errors::domain::{DomainError, InfraErrorKind};
use crate::errors::ErrorCode;
use crate::extractors::current_user::CurrentUser;
use crate::idempotency::claims::{self, ClaimOutcome, NewClaim, StoredResponse};
use crate::idempotency::IDEMPOTENCY_HEADER;
use crate::state::app_state::AppState;
use crate::trace_ctx;

pub const REPLAYED_HEADER: &str = "idempotency-replayed";

pub struct IdempotencyGuard;

impl<S, B> Transform<S, ServiceRequest> for IdempotencyGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = IdempotencyGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdempotencyGuardMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct IdempotencyGuardMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdempotencyGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let key = match read_key(&req) {
                KeyHeader::Absent => return pass_through(&service, req).await,
                KeyHeader::Invalid => {
                    return Ok(req.error_response(AppError::bad_request(
                        ErrorCode::InvalidIdempotencyKey,
                        format!(
                            "{IDEMPOTENCY_HEADER} must be 1-{} characters of [A-Za-z0-9._:-]",
                            claims::MAX_KEY_LEN
                        ),
                    )))
                }
                KeyHeader::Valid(key) => key,
            };

            let user_id = req.extensions().get::<CurrentUser>().map(|u| u.id);
            let state = req.app_data::<web::Data<AppState>>().cloned();
            let (Some(user_id), Some(state)) = (user_id, state) else {
                return pass_through(&service, req).await;
            };

            let pending = PendingClaim {
                key: key.clone(),
                user_id,
                method: req.method().as_str().to_owned(),
                path: req.path().to_owned(),
                ttl: state.idempotency_ttl,
            };

            let claim_id = match claim_detached(state.db().clone(), pending).await {
                Ok(ClaimOutcome::Claimed { claim_id }) => claim_id,
                Ok(ClaimOutcome::Replay(stored)) => {
                    debug!(idempotency_key = %key, status = stored.status, "Replaying stored response");
                    return Ok(req.into_response(replay_response(&stored)));
                }
                Ok(ClaimOutcome::InFlight) => {
                    return Ok(req.error_response(AppError::conflict(
                        ErrorCode::IdempotencyInProgress,
                        "A request with this idempotency key is already in progress",
                    )))
                }
                Ok(ClaimOutcome::KeyReused) => {
                    return Ok(req.error_response(AppError::invalid(
                        ErrorCode::IdempotencyKeyReused,
                        "This idempotency key was already used for a different request",
                    )))
                }
                Err(e) => {
                    warn!(idempotency_key = %key, error = %e, "Idempotency claim failed; proceeding unguarded");
                    return pass_through(&service, req).await;
                }
            };

            // No await between receiving the claim and arming the guard.
            let guard = ClaimGuard::new(state.db().clone(), claim_id);

            let res = match service.call(req).await {
                Ok(res) => res,
                Err(e) => {
                    guard.release().await;
                    return Err(e);
                }
            };

            if res.status().is_server_error() {
                guard.release().await;
                return Ok(res.map_into_boxed_body());
            }

            let (req, res) = res.into_parts();
            let (res, body) = res.into_parts();
            let bytes = match body::to_bytes(body).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    let e: Box<dyn std::error::Error> = e.into();
                    guard.release().await;
                    return Err(actix_web::error::ErrorInternalServerError(format!(
                        "failed to read response body: {e}"
                    )));
                }
            };

            let content_type = res
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            match capture(res.status(), content_type, &bytes) {
                Some(stored) => guard.complete(&stored).await,
                None => guard.release().await,
            }

            let res = res.set_body(bytes).map_into_boxed_body();
            Ok(ServiceResponse::new(req, res))
        })
    }
}

struct PendingClaim {
    key: String,
    user_id: i64,
    method: String,
    path: String,
    ttl: time::Duration,
}

/// Run the claim on its own task so that a request dropped mid-claim cannot
/// strand a pending row: if nobody is waiting when the claim lands, the task
/// releases it.
async fn claim_detached(db: DatabaseConnection, pending: PendingClaim) -> Result<ClaimOutcome, DomainError> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(trace_ctx::inherit(async move {
        let new_claim = NewClaim {
            key: &pending.key,
            user_id: pending.user_id,
            method: &pending.method,
            path: &pending.path,
            ttl: pending.ttl,
        };
        let outcome = claims::claim(&db, &new_claim).await;
        if let Err(Ok(ClaimOutcome::Claimed { claim_id })) = tx.send(outcome) {
            release_abandoned(&db, claim_id).await;
        }
    }));

    rx.await.unwrap_or_else(|_| {
        Err(DomainError::infra(
            InfraErrorKind::Other("claim task".into()),
            "idempotency claim task ended without a result",
        ))
    })
}

async fn release_abandoned(db: &DatabaseConnection, claim_id: i64) {
    match claims::release(db, claim_id).await {
        Ok(_) => debug!(claim_id, "Released claim for abandoned request"),
        Err(e) => warn!(claim_id, error = %e, "Failed to release abandoned claim"),
    }
}

enum KeyHeader {
    Absent,
    Invalid,
    Valid(String),
}

fn read_key(req: &ServiceRequest) -> KeyHeader {
    if !is_mutating(req.method()) {
        return KeyHeader::Absent;
    }
    match req.headers().get(IDEMPOTENCY_HEADER) {
        None => KeyHeader::Absent,
        Some(value) => match value.to_str() {
            Ok(key) if claims::is_valid_key(key) => KeyHeader::Valid(key.to_owned()),
            _ => KeyHeader::Invalid,
        },
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

async fn pass_through<S, B>(service: &Rc<S>, req: ServiceRequest) -> Result<ServiceResponse<BoxBody>, Error>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody + 'static,
{
    Ok(service.call(req).await?.map_into_boxed_body())
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("json"))
}

/// What to store for a finished response. `None` means it cannot be stored.
fn capture(status: StatusCode, content_type: Option<String>, bytes: &Bytes) -> Option<StoredResponse> {
    let body = if bytes.is_empty() {
        None
    } else if is_json(content_type.as_deref()) {
        Some(serde_json::from_slice::<Value>(bytes).ok()?)
    } else {
        Some(Value::String(std::str::from_utf8(bytes).ok()?.to_owned()))
    };

    Some(StoredResponse {
        status: status.as_u16(),
        body,
        content_type,
    })
}

fn replay_response(stored: &StoredResponse) -> HttpResponse {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
    let mut builder = HttpResponse::build(status);
    builder.insert_header((
        HeaderName::from_static(REPLAYED_HEADER),
        HeaderValue::from_static("true"),
    ));
    if let Some(ct) = &stored.content_type {
        builder.insert_header((header::CONTENT_TYPE, ct.as_str()));
    }

    match &stored.body {
        None => builder.finish(),
        Some(Value::String(text)) if !is_json(stored.content_type.as_deref()) => {
            builder.body(text.clone())
        }
        Some(value) => match serde_json::to_vec(value) {
            Ok(bytes) => builder.body(bytes),
            Err(_) => builder.finish(),
        },
    }
}

/// Owns a pending claim until it is completed or released.
///
/// Dropping an armed guard (the request future was cancelled because the
/// client went away) deletes the pending row in a background task. The
/// delete only matches `pending` rows, so it can never undo a capture.
struct ClaimGuard {
    db: DatabaseConnection,
    claim_id: i64,
    armed: bool,
}

impl ClaimGuard {
    fn new(db: DatabaseConnection, claim_id: i64) -> Self {
        Self {
            db,
            claim_id,
            armed: true,
        }
    }

    async fn complete(mut self, stored: &StoredResponse) {
        self.armed = false;
        match claims::complete(&self.db, self.claim_id, stored).await {
            Ok(true) => {}
            Ok(false) => debug!(claim_id = self.claim_id, "Claim already settled"),
            // Left pending; expiry makes it reclaimable.
            Err(e) => warn!(claim_id = self.claim_id, error = %e, "Failed to store idempotent response"),
        }
    }

    async fn release(mut self) {
        self.armed = false;
        if let Err(e) = claims::release(&self.db, self.claim_id).await {
            warn!(claim_id = self.claim_id, error = %e, "Failed to release idempotency claim");
        }
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(claim_id = self.claim_id, "No runtime to release abandoned claim");
            return;
        };
        let db = self.db.clone();
        let claim_id = self.claim_id;
        handle.spawn(trace_ctx::inherit(async move {
            release_abandoned(&db, claim_id).await;
        }));
    }
}
