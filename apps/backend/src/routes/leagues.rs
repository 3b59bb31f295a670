use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{web, HttpResponse};

use crate::error::AppError;
use crate::extractors::current_user::CurrentUser;
use crate::extractors::idempotency_key::IdempotencyKey;
use crate::extractors::path_id::PathId;
use crate::middleware::idempotency::REPLAYED_HEADER;
use crate::state::app_state::AppState;

/// POST /api/leagues/{id}/season-rollover
///
/// Requires `x-idempotency-key`; a retry with the same key returns the
/// stored result even after the HTTP claim has expired.
async fn season_rollover(
    league_id: PathId,
    user: CurrentUser,
    key: IdempotencyKey,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let rollover = app_state
        .seasons
        .rollover_season(league_id.0, user.id, &key.0)
        .await?;

    let mut res = HttpResponse::Ok();
    if rollover.replayed {
        res.insert_header((
            HeaderName::from_static(REPLAYED_HEADER),
            HeaderValue::from_static("true"),
        ));
    }
    Ok(res.json(rollover.response))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{id}/season-rollover", web::post().to(season_rollover));
}
