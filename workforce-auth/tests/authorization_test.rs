//! Bearer resolution, role gates and tenant scoping over HTTP.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{
    test_config, TestApp, ACME, ADMIN_ID, GLOBEX_MANAGER_EMAIL, GLOBEX_MANAGER_ID, MANAGER_EMAIL,
    MANAGER_ID, NEW_HIRE_ID,
};
use serde_json::json;
use workforce_auth::{
    models::{Role, Session},
    services::{AuthStore, MockEmailService},
};

const ACME_EMPLOYEES: &str = "/companies/company-acme/employees";

#[tokio::test]
async fn manager_route_gates_by_role() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get(ACME_EMPLOYEES, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let employee = app.employee_token().await;
    let (status, body) = app.get(ACME_EMPLOYEES, Some(&employee)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let manager = app.manager_token().await;
    let (status, body) = app.get(ACME_EMPLOYEES, Some(&manager)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let admin = app.admin_token().await;
    let (status, _) = app.get(ACME_EMPLOYEES, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn manager_is_confined_to_own_company() {
    let app = TestApp::spawn().await;
    let token = app
        .login(GLOBEX_MANAGER_ID, Role::Manager, GLOBEX_MANAGER_EMAIL)
        .await;

    let (status, body) = app.get(ACME_EMPLOYEES, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .get("/companies/company-globex/employees", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_reject_company_users() {
    let app = TestApp::spawn().await;

    let admin = app.admin_token().await;
    let (status, body) = app.get("/admin/companies", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let manager = app.manager_token().await;
    let (status, _) = app.get("/admin/companies", Some(&manager)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_without_stored_role_resolves_from_session() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let (status, me) = app.get("/auth/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], ADMIN_ID);
    assert_eq!(me["role"], "admin");
    assert!(me["company_id"].is_null());
}

#[tokio::test]
async fn malformed_bearer_headers_are_anonymous() {
    let app = TestApp::spawn().await;
    let token = app.manager_token().await;

    for value in [
        token.clone(),
        format!("Basic {}", token),
        format!("Bearer {} extra", token),
        "Bearer".to_string(),
    ] {
        let request = Request::builder()
            .uri("/auth/me")
            .header("Authorization", value.as_str())
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", value);
        assert_eq!(body["error"], "unauthenticated");
    }

    let request = Request::builder()
        .uri("/auth/me")
        .header("Authorization", format!("bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn custom_auth_header_is_read_first() {
    let mut config = test_config();
    config.security.auth_header_name = "x-session-token".to_string();
    let app = TestApp::spawn_with(config, MockEmailService::new()).await;
    let token = app.manager_token().await;

    let request = Request::builder()
        .uri("/auth/me")
        .header("x-session-token", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, me) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], MANAGER_ID);

    let (status, _) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_session_is_anonymous() {
    let app = TestApp::spawn().await;
    let session = Session::new(
        MANAGER_ID.to_string(),
        Role::Manager,
        MANAGER_EMAIL,
        "old-session-token".to_string(),
        Utc::now() - Duration::days(31),
    );
    app.store.insert_session(&session).await.unwrap();

    let (status, body) = app.get("/auth/me", Some("old-session-token")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn session_of_vanished_user_is_anonymous() {
    let app = TestApp::spawn().await;
    let token = app
        .login("ghost", Role::Employee, "ghost@acme.test")
        .await;

    let (status, _) = app.get("/auth/me", Some(&token)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

async fn accept_latest_invitation(app: &TestApp) -> (StatusCode, serde_json::Value) {
    let path = format!("/invitations/{}/accept", app.last_emailed_token());
    app.post(&path, None, json!({})).await
}

#[tokio::test]
async fn session_does_not_follow_a_reassigned_email() {
    let app = TestApp::spawn().await;
    let manager = app.manager_token().await;

    // The new hire claims x@, then moves to y@, freeing x@.
    let (status, _) = app
        .post(
            "/invitations",
            Some(&manager),
            json!({ "employee_id": NEW_HIRE_ID, "invited_email": "x@acme.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, first) = accept_latest_invitation(&app).await;
    let old_session = first["session_token"].as_str().unwrap().to_string();

    app.post(
        "/invitations",
        Some(&manager),
        json!({ "employee_id": NEW_HIRE_ID, "invited_email": "y@acme.test" }),
    )
    .await;
    let (status, second) = accept_latest_invitation(&app).await;
    assert_eq!(status, StatusCode::OK);
    let new_session = second["session_token"].as_str().unwrap().to_string();

    // Another employee claims the freed x@.
    let (status, created) = app
        .post(
            "/employees",
            Some(&manager),
            json!({ "first_name": "Eli", "last_name": "Two", "invited_email": "x@acme.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = accept_latest_invitation(&app).await;
    assert_eq!(status, StatusCode::OK);
    let other_id = created["employee"]["id"].as_str().unwrap().to_string();
    assert_eq!(
        app.store.company_user(&other_id).unwrap().email.as_deref(),
        Some("x@acme.test")
    );

    let (status, body) = app.get("/auth/me", Some(&old_session)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, me) = app.get("/auth/me", Some(&new_session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], NEW_HIRE_ID);
}

#[tokio::test]
async fn public_routes_need_no_session() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/invitations/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "invalid_token");

    let (status, _) = app
        .post(
            "/employees",
            None,
            json!({ "company_id": ACME, "first_name": "A", "last_name": "B" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
