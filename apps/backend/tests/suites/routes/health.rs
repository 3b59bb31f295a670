use actix_web::http::StatusCode;
use actix_web::test;
use backend::error::AppError;
use backend::test_support::{create_test_app, test_state};

use crate::common::read_json;

#[actix_web::test]
async fn health_reports_database() -> Result<(), AppError> {
    let state = test_state().await?;
    let app = create_test_app(state).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let body = read_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "ok");
    assert!(body["app_version"].is_string());
    assert!(body["time"].is_string());
    Ok(())
}
