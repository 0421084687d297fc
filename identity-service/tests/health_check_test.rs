mod common;

use axum::{body::Body, http::StatusCode};
use common::{json_body, TestApp};

#[tokio::test]
async fn health_check_reports_healthy() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "identity-service-test");
    assert_eq!(body["checks"]["database"], "up");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/.well-known/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/auth/sign-in"].is_object());
    assert!(body["paths"]["/auth/password/reset"].is_object());
}
