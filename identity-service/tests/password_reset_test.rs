mod common;

use axum::http::{header, StatusCode};
use common::{TestApp, PASSWORD};
use identity_service::{
    models::{IdentityFor, RequestScope, UserType},
    services::IdentityVerificationStore,
};
use uuid::Uuid;

const NEW_PASSWORD: &str = "N3wSecret!";

fn wrong_code(code: &str) -> &'static str {
    if code == "000000" {
        "111111"
    } else {
        "000000"
    }
}

async fn forgot(app: &TestApp, email: &str) -> Uuid {
    let (status, body) = app
        .post_json(
            "/auth/password/forgot",
            "CUSTOMER",
            serde_json::json!({ "email": email }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    body["verification_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn full_password_reset_flow() {
    let app = TestApp::spawn().await;
    app.sign_up_customer("alice", "alice@example.com").await;

    let verification_id = forgot(&app, "alice@example.com").await;

    let sent = app.mailbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].purpose, IdentityFor::PasswordReset);
    let code = app.mailbox.last_code_for("alice@example.com").unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    // A wrong code is rejected and counted
    let (status, _) = app
        .post_json(
            "/auth/identity/verify",
            "CUSTOMER",
            serde_json::json!({ "verification_id": verification_id, "code": wrong_code(&code) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let scope = RequestScope::new(app.organization_id, UserType::Customer);
    let challenge = app.store.find_by_id(&scope, verification_id).await.unwrap();
    assert_eq!(challenge.try_count, 1);

    let (status, body) = app
        .post_json(
            "/auth/identity/verify",
            "CUSTOMER",
            serde_json::json!({ "verification_id": verification_id, "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "VERIFIED");

    let (status, _) = app
        .post_json(
            "/auth/password/reset",
            "CUSTOMER",
            serde_json::json!({
                "verification_id": verification_id,
                "code": code,
                "new_password": NEW_PASSWORD,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.sign_in("CUSTOMER", "alice", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.sign_in("CUSTOMER", "alice", NEW_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    // The challenge cannot be replayed
    let (status, _) = app
        .post_json(
            "/auth/password/reset",
            "CUSTOMER",
            serde_json::json!({
                "verification_id": verification_id,
                "code": code,
                "new_password": "An0therSecret!",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_email_is_indistinguishable() {
    let app = TestApp::spawn().await;
    app.sign_up_customer("alice", "alice@example.com").await;

    let known_id = forgot(&app, "alice@example.com").await;
    let code = app.mailbox.last_code_for("alice@example.com").unwrap();
    let ghost_id = forgot(&app, "ghost@example.com").await;
    assert_eq!(app.mailbox.sent().len(), 1);

    let guess = wrong_code(&code);
    let (known_status, known_body) = app
        .post_json(
            "/auth/identity/verify",
            "CUSTOMER",
            serde_json::json!({ "verification_id": known_id, "code": guess }),
        )
        .await;
    let (ghost_status, ghost_body) = app
        .post_json(
            "/auth/identity/verify",
            "CUSTOMER",
            serde_json::json!({ "verification_id": ghost_id, "code": guess }),
        )
        .await;

    assert_eq!(ghost_status, StatusCode::BAD_REQUEST);
    assert_eq!(ghost_status, known_status);
    assert_eq!(ghost_body, known_body);
}

#[tokio::test]
async fn challenge_is_bound_to_its_organization() {
    let app = TestApp::spawn().await;
    app.sign_up_customer("alice", "alice@example.com").await;

    let verification_id = forgot(&app, "alice@example.com").await;
    let code = app.mailbox.last_code_for("alice@example.com").unwrap();

    let request = common::scoped_request(
        "POST",
        "/auth/identity/verify",
        Uuid::new_v4(),
        "CUSTOMER",
    )
    .header(header::CONTENT_TYPE, "application/json")
    .body(axum::body::Body::from(
        serde_json::json!({ "verification_id": verification_id, "code": code }).to_string(),
    ))
    .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn change_password_requires_bearer_token() {
    let app = TestApp::spawn().await;
    app.sign_up_customer("alice", "alice@example.com").await;

    let payload = serde_json::json!({
        "current_password": PASSWORD,
        "new_password": NEW_PASSWORD,
    });

    let (status, _) = app
        .post_json("/auth/password/change", "CUSTOMER", payload.clone())
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, login) = app.sign_in("CUSTOMER", "alice", PASSWORD).await;
    let token = login["token"].as_str().unwrap();

    let request = app
        .request("POST", "/auth/password/change", "CUSTOMER")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(axum::body::Body::from(payload.to_string()))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = app.sign_in("CUSTOMER", "alice", NEW_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
}
