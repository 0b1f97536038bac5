use service_core::axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::{admin::CompanyResponse, ErrorResponse},
    middleware::CurrentUser,
    models::Role,
    AppState,
};

/// List every company on the platform
#[utoipa::path(
    get,
    path = "/admin/companies",
    responses(
        (status = 200, description = "All companies", body = [CompanyResponse]),
        (status = 401, description = "unauthenticated", body = ErrorResponse),
        (status = 403, description = "forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_companies(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<CompanyResponse>>, AppError> {
    current.require(&[Role::Admin])?;
    let companies = state.store.list_companies().await?;
    Ok(Json(companies.into_iter().map(CompanyResponse::from).collect()))
}
