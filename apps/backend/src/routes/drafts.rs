//! Draft HTTP routes.
//!
//! Handlers are thin: they pull the caller and ids out of the request and
//! hand them to [`DraftEngine`](crate::draft::DraftEngine), which owns all
//! locking.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::current_user::CurrentUser;
use crate::extractors::path_id::PathId;
use crate::extractors::validated_json::ValidatedJson;
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PickRequest {
    pub player_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutodraftRequest {
    pub enabled: bool,
}

/// GET /api/drafts/{id}
async fn get_draft(
    draft_id: PathId,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let snapshot = app_state.engine.snapshot(draft_id.0).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// POST /api/drafts/{id}/start
async fn start_draft(
    draft_id: PathId,
    user: CurrentUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let draft = app_state.engine.start_draft(draft_id.0, user.id).await?;
    Ok(HttpResponse::Ok().json(draft))
}

/// POST /api/drafts/{id}/pause
async fn pause_draft(
    draft_id: PathId,
    user: CurrentUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let draft = app_state.engine.pause_draft(draft_id.0, user.id).await?;
    Ok(HttpResponse::Ok().json(draft))
}

/// POST /api/drafts/{id}/resume
async fn resume_draft(
    draft_id: PathId,
    user: CurrentUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let draft = app_state.engine.resume_draft(draft_id.0, user.id).await?;
    Ok(HttpResponse::Ok().json(draft))
}

/// POST /api/drafts/{id}/picks
async fn make_pick(
    draft_id: PathId,
    user: CurrentUser,
    body: ValidatedJson<PickRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let pick = app_state
        .engine
        .make_pick(draft_id.0, user.id, body.player_id)
        .await?;
    Ok(HttpResponse::Created().json(pick))
}

/// PUT /api/drafts/{id}/autodraft
async fn set_autodraft(
    draft_id: PathId,
    user: CurrentUser,
    body: ValidatedJson<AutodraftRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let entry = app_state
        .engine
        .set_autodraft(draft_id.0, user.id, body.enabled)
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

/// GET /api/drafts/{id}/queue
async fn list_queue(
    draft_id: PathId,
    user: CurrentUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let queue = app_state.engine.queue_list(draft_id.0, user.id).await?;
    Ok(HttpResponse::Ok().json(queue))
}

/// POST /api/drafts/{id}/queue
async fn add_to_queue(
    draft_id: PathId,
    user: CurrentUser,
    body: ValidatedJson<PickRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let queue = app_state
        .engine
        .queue_add(draft_id.0, user.id, body.player_id)
        .await?;
    Ok(HttpResponse::Created().json(queue))
}

/// DELETE /api/drafts/{id}/queue/{player_id}
async fn remove_from_queue(
    req: HttpRequest,
    draft_id: PathId,
    user: CurrentUser,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let player_id = PathId::parse(req.match_info().get("player_id"))?;
    app_state
        .engine
        .queue_remove(draft_id.0, user.id, player_id.0)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{id}", web::get().to(get_draft))
        .route("/{id}/start", web::post().to(start_draft))
        .route("/{id}/pause", web::post().to(pause_draft))
        .route("/{id}/resume", web::post().to(resume_draft))
        .route("/{id}/picks", web::post().to(make_pick))
        .route("/{id}/autodraft", web::put().to(set_autodraft))
        .route("/{id}/queue", web::get().to(list_queue))
        .route("/{id}/queue", web::post().to(add_to_queue))
        .route("/{id}/queue/{player_id}", web::delete().to(remove_from_queue));
}
