use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse};
use backend::config::db::DbConfig;
use backend::error::AppError;
use backend::idempotency::claims::{self, ClaimOutcome, NewClaim};
use backend::infra::state::build_state;
use backend::middleware::idempotency::IdempotencyGuard;
use backend::middleware::jwt_extract::JwtExtract;
use backend::repos::draft_picks;
use backend::state::security_config::SecurityConfig;
use backend::test_support::{
    bearer_for, create_test_app, seed_league, test_state, LeagueFixture, LeagueSeed, TEST_JWT_SECRET,
};
use backend::AppState;
use backend_test_support::problem_details::assert_problem;
use futures::future::join_all;
use serde_json::json;
use time::Duration;
use tokio::sync::Notify;

use crate::support::draft_helpers::start;
use crate::support::http::{authed, fresh_key, REPLAYED_HEADER};

async fn started_league(state: &AppState) -> Result<LeagueFixture, AppError> {
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;
    Ok(fx)
}

#[actix_web::test]
async fn completed_request_replays_identical_body() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state.clone()).await;
    let key = fresh_key();
    let uri = format!("/api/drafts/{}/queue", fx.draft_id);

    let first = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[3]}))
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert!(first.headers().get(REPLAYED_HEADER).is_none());
    let first_body = test::read_body(first).await;

    let second = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[3]}))
            .to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CREATED);
    assert_eq!(
        second.headers().get(REPLAYED_HEADER).and_then(|v| v.to_str().ok()),
        Some("true")
    );
    let second_body = test::read_body(second).await;
    assert_eq!(first_body, second_body, "replay must be byte-identical");

    let queue = state.engine.queue_list(fx.draft_id, fx.owner(1)).await?;
    assert_eq!(queue.len(), 1, "handler ran once");
    Ok(())
}

#[actix_web::test]
async fn no_content_replays_as_empty_204() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    state.engine.queue_add(fx.draft_id, fx.owner(1), fx.players[4]).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state.clone()).await;
    let key = fresh_key();
    let uri = format!("/api/drafts/{}/queue/{}", fx.draft_id, fx.players[4]);

    let first = test::call_service(
        &app,
        authed(test::TestRequest::delete().uri(&uri), &bearer, Some(&key)).to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let replay = test::call_service(
        &app,
        authed(test::TestRequest::delete().uri(&uri), &bearer, Some(&key)).to_request(),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::NO_CONTENT);
    assert!(replay.headers().get(REPLAYED_HEADER).is_some());
    assert!(test::read_body(replay).await.is_empty());

    // Without the key the delete runs again and finds nothing.
    let fresh = test::call_service(
        &app,
        authed(test::TestRequest::delete().uri(&uri), &bearer, None).to_request(),
    )
    .await;
    assert_problem(fresh, StatusCode::NOT_FOUND, "PLAYER_NOT_FOUND").await;
    Ok(())
}

#[actix_web::test]
async fn pending_claim_answers_409() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let key = fresh_key();
    let uri = format!("/api/drafts/{}/queue", fx.draft_id);

    let pending = claims::claim(
        state.db(),
        &NewClaim {
            key: &key,
            user_id: fx.owner(1),
            method: "POST",
            path: &uri,
            ttl: Duration::hours(1),
        },
    )
    .await?;
    assert!(matches!(pending, ClaimOutcome::Claimed { .. }));

    let app = create_test_app(state.clone()).await;
    let resp = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[0]}))
            .to_request(),
    )
    .await;
    assert_problem(resp, StatusCode::CONFLICT, "IDEMPOTENCY_IN_PROGRESS").await;

    let queue = state.engine.queue_list(fx.draft_id, fx.owner(1)).await?;
    assert!(queue.is_empty(), "handler must not run");
    Ok(())
}

#[actix_web::test]
async fn malformed_keys_are_rejected() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state.clone()).await;
    let uri = format!("/api/drafts/{}/queue", fx.draft_id);

    let too_long = "a".repeat(257);
    for key in ["bad key!", "semi;colon", too_long.as_str()] {
        let resp = test::call_service(
            &app,
            authed(test::TestRequest::post().uri(&uri), &bearer, Some(key))
                .set_json(json!({"player_id": fx.players[0]}))
                .to_request(),
        )
        .await;
        assert_problem(resp, StatusCode::BAD_REQUEST, "INVALID_IDEMPOTENCY_KEY").await;
    }
    Ok(())
}

#[actix_web::test]
async fn key_reused_for_other_endpoint_is_422() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state.clone()).await;
    let key = fresh_key();

    let add = test::call_service(
        &app,
        authed(
            test::TestRequest::post().uri(&format!("/api/drafts/{}/queue", fx.draft_id)),
            &bearer,
            Some(&key),
        )
        .set_json(json!({"player_id": fx.players[2]}))
        .to_request(),
    )
    .await;
    assert_eq!(add.status(), StatusCode::CREATED);

    let reuse = test::call_service(
        &app,
        authed(
            test::TestRequest::put().uri(&format!("/api/drafts/{}/autodraft", fx.draft_id)),
            &bearer,
            Some(&key),
        )
        .set_json(json!({"enabled": true}))
        .to_request(),
    )
    .await;
    assert_problem(reuse, StatusCode::UNPROCESSABLE_ENTITY, "IDEMPOTENCY_KEY_REUSED").await;
    Ok(())
}

#[actix_web::test]
async fn client_errors_are_stored_and_replayed() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    // Position 2 picks second; picking now is out of turn.
    let bearer = bearer_for(&state, fx.owner(2))?;
    let app = create_test_app(state.clone()).await;
    let key = fresh_key();
    let uri = format!("/api/drafts/{}/picks", fx.draft_id);

    let first = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[0]}))
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let first_body = test::read_body(first).await;

    let replay = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[0]}))
            .to_request(),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(replay.headers().get(REPLAYED_HEADER).is_some());
    assert_eq!(test::read_body(replay).await, first_body);
    Ok(())
}

#[actix_web::test]
async fn expired_claim_runs_the_handler_again() -> Result<(), AppError> {
    let state = build_state()
        .with_db(DbConfig::sqlite_memory())
        .with_security(SecurityConfig::new(TEST_JWT_SECRET))
        .with_idempotency_ttl(Duration::ZERO)
        .build()
        .await?;
    let fx = started_league(&state).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state.clone()).await;
    let key = fresh_key();
    let uri = format!("/api/drafts/{}/queue", fx.draft_id);

    let first = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[1]}))
            .to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    // The stored response has expired, so this is a fresh execution.
    let second = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[1]}))
            .to_request(),
    )
    .await;
    assert!(second.headers().get(REPLAYED_HEADER).is_none());
    assert_problem(second, StatusCode::CONFLICT, "ALREADY_QUEUED").await;
    Ok(())
}

#[actix_web::test]
async fn get_requests_ignore_the_key() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state.clone()).await;

    let resp = test::call_service(
        &app,
        authed(
            test::TestRequest::get().uri(&format!("/api/drafts/{}", fx.draft_id)),
            &bearer,
            Some("not a valid key"),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = claims::find(state.db(), "not a valid key", fx.owner(1)).await?;
    assert!(stored.is_none());
    Ok(())
}

#[actix_web::test]
async fn concurrent_duplicates_execute_once() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = started_league(&state).await?;
    let bearer = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state.clone()).await;
    let key = fresh_key();
    let uri = format!("/api/drafts/{}/picks", fx.draft_id);

    let requests = (0..8).map(|_| {
        let req = authed(test::TestRequest::post().uri(&uri), &bearer, Some(&key))
            .set_json(json!({"player_id": fx.players[0]}))
            .to_request();
        test::call_service(&app, req)
    });
    let responses = join_all(requests).await;

    let mut success_bodies = Vec::new();
    for resp in responses {
        let status = resp.status();
        if status.is_success() {
            assert_eq!(status, StatusCode::CREATED);
            success_bodies.push(test::read_body(resp).await);
        } else {
            assert_problem(resp, StatusCode::CONFLICT, "IDEMPOTENCY_IN_PROGRESS").await;
        }
    }
    assert!(!success_bodies.is_empty());
    assert!(success_bodies.windows(2).all(|w| w[0] == w[1]), "all successes share one body");

    let picks = draft_picks::list_for_draft(state.db(), fx.draft_id).await?;
    assert_eq!(picks.len(), 1, "exactly one pick was written");
    Ok(())
}

/// Counts calls. The first call either fails with 500 or hangs (after
/// signalling `entered`), depending on `first`; later calls succeed.
#[derive(Clone)]
struct FlakyHandler {
    calls: Arc<AtomicUsize>,
    entered: Arc<Notify>,
    first: FirstCall,
}

#[derive(Clone, Copy)]
enum FirstCall {
    ServerError,
    Hang,
}

async fn flaky(handler: web::Data<FlakyHandler>) -> HttpResponse {
    let call = handler.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if call == 1 {
        match handler.first {
            FirstCall::ServerError => return HttpResponse::InternalServerError().finish(),
            FirstCall::Hang => {
                handler.entered.notify_one();
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
        }
    }
    HttpResponse::Created().json(json!({ "call": call }))
}

async fn flaky_app(
    state: AppState,
    handler: FlakyHandler,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::Data::new(handler))
            .service(
                web::scope("/api")
                    .wrap(IdempotencyGuard)
                    .wrap(JwtExtract)
                    .route("/flaky", web::post().to(flaky)),
            ),
    )
    .await
}

fn flaky_handler(first: FirstCall) -> FlakyHandler {
    FlakyHandler {
        calls: Arc::new(AtomicUsize::new(0)),
        entered: Arc::new(Notify::new()),
        first,
    }
}

#[actix_web::test]
async fn server_error_releases_the_claim() -> Result<(), AppError> {
    let state = test_state().await?;
    let bearer = bearer_for(&state, 42)?;
    let handler = flaky_handler(FirstCall::ServerError);
    let app = flaky_app(state.clone(), handler.clone()).await;
    let key = fresh_key();

    let failed = test::call_service(
        &app,
        authed(test::TestRequest::post().uri("/api/flaky"), &bearer, Some(&key)).to_request(),
    )
    .await;
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(claims::find(state.db(), &key, 42).await?.is_none());

    let retried = test::call_service(
        &app,
        authed(test::TestRequest::post().uri("/api/flaky"), &bearer, Some(&key)).to_request(),
    )
    .await;
    assert_eq!(retried.status(), StatusCode::CREATED);
    assert!(retried.headers().get(REPLAYED_HEADER).is_none());
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2, "retry must run the handler");
    Ok(())
}

#[actix_web::test]
async fn abandoned_request_frees_its_key() -> Result<(), AppError> {
    let state = test_state().await?;
    let bearer = bearer_for(&state, 42)?;
    let handler = flaky_handler(FirstCall::Hang);
    let app = flaky_app(state.clone(), handler.clone()).await;
    let key = fresh_key();

    let request = test::call_service(
        &app,
        authed(test::TestRequest::post().uri("/api/flaky"), &bearer, Some(&key)).to_request(),
    );
    tokio::select! {
        _ = request => panic!("first call should still be running"),
        _ = handler.entered.notified() => {}
    }
    // `request` is dropped here, as when the client disconnects.

    let mut released = false;
    for _ in 0..50 {
        if claims::find(state.db(), &key, 42).await?.is_none() {
            released = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(released, "pending claim should be deleted once the request is gone");

    let retried = test::call_service(
        &app,
        authed(test::TestRequest::post().uri("/api/flaky"), &bearer, Some(&key)).to_request(),
    )
    .await;
    assert_eq!(retried.status(), StatusCode::CREATED);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    Ok(())
}
