use service_core::axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        invitation::{InvitationResponse, IssueInvitationRequest},
        ErrorResponse,
    },
    middleware::{require_same_company, CurrentUser},
    models::{NewInvitation, Role},
    services::{AcceptedInvitation, InvitationPreview, ServiceError},
    utils::ValidatedJson,
    AppState,
};

/// Invite an existing employee to claim an email address
///
/// Supersedes any pending invitation for the same employee.
#[utoipa::path(
    post,
    path = "/invitations",
    request_body = IssueInvitationRequest,
    responses(
        (status = 201, description = "Invitation sent", body = InvitationResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "unauthenticated", body = ErrorResponse),
        (status = 403, description = "forbidden", body = ErrorResponse),
        (status = 404, description = "user_not_found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invitations"
)]
#[tracing::instrument(skip_all)]
pub async fn issue_invitation(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<IssueInvitationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require(&[Role::Manager])?;

    let employee = state
        .store
        .find_company_user_by_id(&req.employee_id)
        .await?
        .ok_or(ServiceError::UserNotFound)?;
    require_same_company(user, &employee.company_id)?;

    let company = state
        .store
        .find_company_by_id(&employee.company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("company_not_found")))?;

    let invitation = state
        .invitations
        .issue(NewInvitation {
            employee_id: employee.id.clone(),
            company_id: employee.company_id.clone(),
            company_name: company.name,
            employee_name: employee.full_name(),
            invited_email: req.invited_email,
            sent_by_user_id: user.id.clone(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(InvitationResponse::from(invitation))))
}

/// Preview an invitation before accepting it
#[utoipa::path(
    get,
    path = "/invitations/{token}",
    params(("token" = String, Path, description = "Invitation token from the email link")),
    responses(
        (status = 200, description = "Invitation preview; check is_valid", body = InvitationPreview),
        (status = 404, description = "invalid_token", body = ErrorResponse)
    ),
    tag = "Invitations"
)]
pub async fn validate_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationPreview>, AppError> {
    Ok(Json(state.invitations.validate(&token).await?))
}

/// Accept an invitation and sign in
#[utoipa::path(
    post,
    path = "/invitations/{token}/accept",
    params(("token" = String, Path, description = "Invitation token from the email link")),
    responses(
        (status = 200, description = "Accepted; a session was created", body = AcceptedInvitation),
        (status = 404, description = "invalid_token or user_not_found", body = ErrorResponse),
        (status = 409, description = "already_accepted, already_expired, already_revoked or email_in_use", body = ErrorResponse),
        (status = 410, description = "expired", body = ErrorResponse)
    ),
    tag = "Invitations"
)]
#[tracing::instrument(skip_all)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<AcceptedInvitation>, AppError> {
    Ok(Json(state.invitations.accept(&token).await?))
}
