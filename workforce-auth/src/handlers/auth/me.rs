use service_core::axum::Json;
use service_core::error::AppError;

use crate::{
    dtos::ErrorResponse,
    middleware::CurrentUser,
    models::{AuthenticatedUser, Role},
};

/// Current user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The authenticated caller", body = AuthenticatedUser),
        (status = 401, description = "unauthenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn get_me(current: CurrentUser) -> Result<Json<AuthenticatedUser>, AppError> {
    let user = current.require(&[Role::Manager, Role::Employee])?;
    Ok(Json(user.clone()))
}
