//! Invitation issue, preview and acceptance over HTTP.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{TestApp, ACME, EMPLOYEE_EMAIL, EMPLOYEE_ID, GLOBEX, NEW_HIRE_ID};
use serde_json::json;
use workforce_auth::{
    models::{Invitation, InvitationState, NewInvitation, UserInvitationStatus},
    services::{AuthStore, MockEmailService, SentEmail},
};

async fn invite(app: &TestApp, email: &str) -> (StatusCode, serde_json::Value) {
    let token = app.manager_token().await;
    app.post(
        "/invitations",
        Some(&token),
        json!({ "employee_id": NEW_HIRE_ID, "invited_email": email }),
    )
    .await
}

#[tokio::test]
async fn issue_preview_accept_end_to_end() {
    let app = TestApp::spawn().await;

    let (status, issued) = invite(&app, "New.Hire@Acme.test").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issued["status"], "pending");
    assert_eq!(issued["invited_email"], "new.hire@acme.test");
    assert!(issued.get("token").is_none());

    match app.email.sent().last() {
        Some(SentEmail::Invitation { to, email }) => {
            assert_eq!(to, "new.hire@acme.test");
            assert_eq!(email.company_name, "Acme");
            assert!(email.accept_link.contains("/accept-invitation?token="));
        }
        other => panic!("expected an invitation email, got {:?}", other),
    }
    let token = app.last_emailed_token();
    assert_eq!(token.len(), 32);

    let (status, preview) = app.get(&format!("/invitations/{}", token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["company_name"], "Acme");
    assert_eq!(preview["is_valid"], true);

    let (status, accepted) = app
        .post(&format!("/invitations/{}/accept", token), None, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["user_id"], NEW_HIRE_ID);

    let user = app.store.company_user(NEW_HIRE_ID).unwrap();
    assert_eq!(user.email.as_deref(), Some("new.hire@acme.test"));
    assert_eq!(user.invitation_status, UserInvitationStatus::Accepted);

    let id = issued["id"].as_str().unwrap();
    let invitation = app.store.invitation(id).unwrap();
    assert_eq!(invitation.status, InvitationState::Accepted);
    assert_eq!(invitation.accepted_email.as_deref(), Some("new.hire@acme.test"));
    assert!(invitation.accepted_at.is_some());

    let session_token = accepted["session_token"].as_str().unwrap().to_string();
    let (status, me) = app.get("/auth/me", Some(&session_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], NEW_HIRE_ID);
    assert_eq!(me["role"], "employee");
}

#[tokio::test]
async fn reissue_leaves_exactly_one_pending() {
    let app = TestApp::spawn().await;

    let (_, first) = invite(&app, "hire@acme.test").await;
    let (_, second) = invite(&app, "hire@acme.test").await;

    let invitations = app
        .store
        .find_invitations_for_employee(NEW_HIRE_ID)
        .await
        .unwrap();
    let pending: Vec<_> = invitations
        .iter()
        .filter(|i| i.status == InvitationState::Pending)
        .collect();

    assert_eq!(invitations.len(), 2);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second["id"].as_str().unwrap());
    assert_eq!(
        app.store.invitation(first["id"].as_str().unwrap()).unwrap().status,
        InvitationState::Revoked
    );
}

#[tokio::test]
async fn second_accept_conflicts_without_side_effects() {
    let app = TestApp::spawn().await;
    invite(&app, "hire@acme.test").await;
    let token = app.last_emailed_token();
    let path = format!("/invitations/{}/accept", token);

    let (first, _) = app.post(&path, None, json!({})).await;
    assert_eq!(first, StatusCode::OK);
    let user_before = app.store.company_user(NEW_HIRE_ID).unwrap();

    let (second, body) = app.post(&path, None, json!({})).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_accepted");

    assert_eq!(app.sessions_for(NEW_HIRE_ID).len(), 1);
    assert_eq!(app.store.company_user(NEW_HIRE_ID).unwrap(), user_before);
}

#[tokio::test]
async fn stale_accept_expires_then_reports_already_expired() {
    let app = TestApp::spawn().await;
    let created = Utc::now() - Duration::days(8);
    let invitation = Invitation::new(
        NewInvitation {
            employee_id: NEW_HIRE_ID.to_string(),
            company_id: ACME.to_string(),
            company_name: "Acme".to_string(),
            employee_name: "New Hire".to_string(),
            invited_email: "late@acme.test".to_string(),
            sent_by_user_id: "manager-acme".to_string(),
        },
        "stale-invitation-token".to_string(),
        created,
    );
    let id = invitation.id.clone();
    app.store.seed_invitation(invitation);

    let path = "/invitations/stale-invitation-token/accept";
    let (status, body) = app.post(path, None, json!({})).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "expired");
    assert_eq!(app.store.invitation(&id).unwrap().status, InvitationState::Expired);

    let (status, body) = app.post(path, None, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_expired");

    assert!(app.sessions_for(NEW_HIRE_ID).is_empty());
    assert!(app.store.company_user(NEW_HIRE_ID).unwrap().email.is_none());
}

#[tokio::test]
async fn email_owned_by_another_user_blocks_acceptance() {
    let app = TestApp::spawn().await;
    let (_, issued) = invite(&app, EMPLOYEE_EMAIL).await;
    let token = app.last_emailed_token();
    let before = app.store.company_user(NEW_HIRE_ID).unwrap();

    let (status, body) = app
        .post(&format!("/invitations/{}/accept", token), None, json!({}))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email_in_use");
    assert_eq!(app.store.company_user(NEW_HIRE_ID).unwrap(), before);
    assert_eq!(
        app.store
            .invitation(issued["id"].as_str().unwrap())
            .unwrap()
            .status,
        InvitationState::Pending
    );
    assert_eq!(
        app.store.company_user(EMPLOYEE_ID).unwrap().email.as_deref(),
        Some(EMPLOYEE_EMAIL)
    );
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/invitations/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "invalid_token");

    let (status, _) = app
        .post("/invitations/does-not-exist/accept", None, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manager_cannot_invite_another_companys_employee() {
    let app = TestApp::spawn().await;
    let token = app
        .login(
            common::GLOBEX_MANAGER_ID,
            workforce_auth::models::Role::Manager,
            common::GLOBEX_MANAGER_EMAIL,
        )
        .await;

    let (status, body) = app
        .post(
            "/invitations",
            Some(&token),
            json!({ "employee_id": NEW_HIRE_ID, "invited_email": "x@globex.test" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(app.email.sent().is_empty());
}

#[tokio::test]
async fn create_employee_with_invitation() {
    let app = TestApp::spawn().await;
    let token = app.manager_token().await;

    let (status, body) = app
        .post(
            "/employees",
            Some(&token),
            json!({ "first_name": "Ola", "last_name": "Nord", "invited_email": "ola@acme.test" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["employee"]["company_id"], ACME);
    assert!(body["employee"]["email"].is_null());
    assert_eq!(body["employee"]["invitation_status"], "pending");
    assert_eq!(body["invitation"]["status"], "pending");
    assert!(body.get("invitation_error").is_none());
}

#[tokio::test]
async fn create_employee_rolls_back_when_email_fails() {
    let app = TestApp::spawn_with_email(MockEmailService::failing()).await;
    let token = app.manager_token().await;

    let (status, body) = app
        .post(
            "/employees",
            Some(&token),
            json!({ "first_name": "Ola", "last_name": "Nord", "invited_email": "ola@acme.test" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["invitation_error"], "email_failed");
    assert!(body["invitation"].is_null());
    assert_eq!(body["employee"]["invitation_status"], "none");

    let employee_id = body["employee"]["id"].as_str().unwrap();
    let invitations = app
        .store
        .find_invitations_for_employee(employee_id)
        .await
        .unwrap();
    assert_eq!(invitations.len(), 1);
    assert_eq!(invitations[0].status, InvitationState::Revoked);
}

#[tokio::test]
async fn issue_surfaces_email_failure_as_opaque_error() {
    let app = TestApp::spawn_with_email(MockEmailService::failing()).await;

    let (status, body) = invite(&app, "hire@acme.test").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(
        app.store.company_user(NEW_HIRE_ID).unwrap().invitation_status,
        UserInvitationStatus::None
    );
}

#[tokio::test]
async fn admin_may_create_employees_in_any_company() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .post(
            "/employees",
            Some(&token),
            json!({ "company_id": GLOBEX, "first_name": "Ada", "last_name": "Byte" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["employee"]["company_id"], GLOBEX);
    assert!(body["invitation"].is_null());
}

#[tokio::test]
async fn superseded_invitation_cannot_be_accepted() {
    let app = TestApp::spawn().await;
    invite(&app, "first@acme.test").await;
    let superseded = app.last_emailed_token();
    invite(&app, "second@acme.test").await;
    let before = app.store.company_user(NEW_HIRE_ID).unwrap();

    let (status, body) = app
        .post(&format!("/invitations/{}/accept", superseded), None, json!({}))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_revoked");
    assert_eq!(app.store.company_user(NEW_HIRE_ID).unwrap(), before);
    assert!(app.sessions_for(NEW_HIRE_ID).is_empty());
}

#[tokio::test]
async fn accepting_for_a_deleted_employee_is_not_found() {
    let app = TestApp::spawn().await;
    let (_, issued) = invite(&app, "hire@acme.test").await;
    let token = app.last_emailed_token();
    app.store.remove_company_user(NEW_HIRE_ID);

    let (status, body) = app
        .post(&format!("/invitations/{}/accept", token), None, json!({}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user_not_found");
    assert!(app.sessions_for(NEW_HIRE_ID).is_empty());
    assert_eq!(
        app.store
            .invitation(issued["id"].as_str().unwrap())
            .unwrap()
            .status,
        InvitationState::Pending
    );
}
