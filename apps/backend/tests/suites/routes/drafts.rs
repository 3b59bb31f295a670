use actix_web::http::StatusCode;
use actix_web::test;
use backend::error::AppError;
use backend::test_support::{bearer_for, create_test_app, seed_league, test_state, LeagueSeed};
use backend_test_support::problem_details::assert_problem;
use serde_json::json;

use crate::common::read_json;
use crate::support::draft_helpers::start;
use crate::support::http::authed;

#[actix_web::test]
async fn api_requires_a_bearer_token() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    let app = create_test_app(state).await;
    let uri = format!("/api/drafts/{}", fx.draft_id);

    let missing = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_problem(missing, StatusCode::UNAUTHORIZED, "UNAUTHORIZED_MISSING_BEARER").await;

    let garbage = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request(),
    )
    .await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[actix_web::test]
async fn snapshot_lists_order_and_picks() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;
    state.engine.make_pick(fx.draft_id, fx.owner(1), fx.players[0]).await?;
    let bearer = bearer_for(&state, fx.owner(2))?;
    let app = create_test_app(state).await;

    let resp = test::call_service(
        &app,
        authed(
            test::TestRequest::get().uri(&format!("/api/drafts/{}", fx.draft_id)),
            &bearer,
            None,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = read_json(resp).await;
    assert_eq!(body["draft"]["id"], fx.draft_id);
    assert_eq!(body["draft"]["status"], "in_progress");
    assert_eq!(body["draft"]["current_pick"], 2);
    assert_eq!(body["order"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["picks"][0]["player_id"], fx.players[0]);
    Ok(())
}

#[actix_web::test]
async fn bad_ids_are_rejected() -> Result<(), AppError> {
    let state = test_state().await?;
    let bearer = bearer_for(&state, 101)?;
    let app = create_test_app(state).await;

    for uri in ["/api/drafts/abc", "/api/drafts/0", "/api/drafts/-4"] {
        let resp = test::call_service(
            &app,
            authed(test::TestRequest::get().uri(uri), &bearer, None).to_request(),
        )
        .await;
        assert_problem(resp, StatusCode::BAD_REQUEST, "INVALID_ID").await;
    }

    let missing = test::call_service(
        &app,
        authed(test::TestRequest::get().uri("/api/drafts/9999"), &bearer, None).to_request(),
    )
    .await;
    assert_problem(missing, StatusCode::NOT_FOUND, "DRAFT_NOT_FOUND").await;
    Ok(())
}

#[actix_web::test]
async fn commissioner_drives_lifecycle_over_http() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    let commissioner = bearer_for(&state, fx.commissioner_id)?;
    let owner = bearer_for(&state, fx.owner(1))?;
    let app = create_test_app(state).await;
    let base = format!("/api/drafts/{}", fx.draft_id);

    let denied = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&format!("{base}/start")), &owner, None).to_request(),
    )
    .await;
    assert_problem(denied, StatusCode::FORBIDDEN, "NOT_COMMISSIONER").await;

    let started = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&format!("{base}/start")), &commissioner, None)
            .to_request(),
    )
    .await;
    assert_eq!(started.status(), StatusCode::OK);
    assert_eq!(read_json(started).await["status"], "in_progress");

    let paused = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&format!("{base}/pause")), &commissioner, None)
            .to_request(),
    )
    .await;
    assert_eq!(read_json(paused).await["status"], "paused");

    let resumed = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&format!("{base}/resume")), &commissioner, None)
            .to_request(),
    )
    .await;
    assert_eq!(read_json(resumed).await["status"], "in_progress");
    Ok(())
}

#[actix_web::test]
async fn pick_and_queue_endpoints() -> Result<(), AppError> {
    let state = test_state().await?;
    let fx = seed_league(state.db(), LeagueSeed::default()).await?;
    start(&state.engine, &fx).await?;
    let first = bearer_for(&state, fx.owner(1))?;
    let second = bearer_for(&state, fx.owner(2))?;
    let app = create_test_app(state).await;
    let base = format!("/api/drafts/{}", fx.draft_id);

    let queued = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&format!("{base}/queue")), &second, None)
            .set_json(json!({"player_id": fx.players[1]}))
            .to_request(),
    )
    .await;
    assert_eq!(queued.status(), StatusCode::CREATED);

    let listed = test::call_service(
        &app,
        authed(test::TestRequest::get().uri(&format!("{base}/queue")), &second, None).to_request(),
    )
    .await;
    let listed = read_json(listed).await;
    assert_eq!(listed[0]["player_id"], fx.players[1]);

    let unknown_field = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&format!("{base}/picks")), &first, None)
            .set_json(json!({"player_id": fx.players[0], "extra": 1}))
            .to_request(),
    )
    .await;
    assert_problem(unknown_field, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let picked = test::call_service(
        &app,
        authed(test::TestRequest::post().uri(&format!("{base}/picks")), &first, None)
            .set_json(json!({"player_id": fx.players[0]}))
            .to_request(),
    )
    .await;
    assert_eq!(picked.status(), StatusCode::CREATED);
    let pick = read_json(picked).await;
    assert_eq!(pick["pick_number"], 1);
    assert_eq!(pick["player_id"], fx.players[0]);

    let autodraft = test::call_service(
        &app,
        authed(test::TestRequest::put().uri(&format!("{base}/autodraft")), &second, None)
            .set_json(json!({"enabled": true}))
            .to_request(),
    )
    .await;
    assert_eq!(autodraft.status(), StatusCode::OK);
    assert_eq!(read_json(autodraft).await["autodraft_enabled"], true);

    let removed = test::call_service(
        &app,
        authed(
            test::TestRequest::delete().uri(&format!("{base}/queue/{}", fx.players[1])),
            &second,
            None,
        )
        .to_request(),
    )
    .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
    Ok(())
}
