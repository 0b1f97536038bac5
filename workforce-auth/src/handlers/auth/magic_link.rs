use service_core::axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{MagicLinkRequest, MagicLinkRequestResponse, VerifyMagicLinkRequest},
        ErrorResponse,
    },
    services::MagicLinkLogin,
    utils::ValidatedJson,
    AppState,
};

const MAGIC_LINK_ACK: &str = "If that address belongs to an account, a sign-in link is on its way.";

/// Request a sign-in link by email
///
/// Responds identically whether or not the address is known.
#[utoipa::path(
    post,
    path = "/auth/magic-link",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, description = "Request accepted", body = MagicLinkRequestResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[tracing::instrument(skip_all)]
pub async fn request_magic_link(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MagicLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.magic_links.request(&req.email).await?;

    Ok(Json(MagicLinkRequestResponse {
        message: MAGIC_LINK_ACK.to_string(),
    }))
}

/// Exchange a magic-link token for a session
#[utoipa::path(
    post,
    path = "/auth/magic-link/verify",
    request_body = VerifyMagicLinkRequest,
    responses(
        (status = 200, description = "Signed in", body = MagicLinkLogin),
        (status = 404, description = "invalid_token or user_not_found", body = ErrorResponse),
        (status = 409, description = "already_used", body = ErrorResponse),
        (status = 410, description = "expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[tracing::instrument(skip_all)]
pub async fn verify_magic_link(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyMagicLinkRequest>,
) -> Result<Json<MagicLinkLogin>, AppError> {
    let login = state.magic_links.verify(&req.token).await?;
    Ok(Json(login))
}
