use service_core::axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        employee::{CreateEmployeeRequest, CreateEmployeeResponse, EmployeeResponse},
        invitation::InvitationResponse,
        ErrorResponse,
    },
    middleware::{require_same_company, CurrentUser},
    models::{CompanyUser, NewInvitation, Role},
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

/// Provision an employee, optionally inviting them
///
/// The employee is created without an email address. If `invited_email` is
/// given an invitation is issued; a failed send leaves the employee in place
/// with `invitation_status = none` and reports `invitation_error`.
#[utoipa::path(
    post,
    path = "/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = CreateEmployeeResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "unauthenticated", body = ErrorResponse),
        (status = 403, description = "forbidden", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
#[tracing::instrument(skip_all)]
pub async fn create_employee(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateEmployeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require(&[Role::Manager])?;

    let company_id = req
        .company_id
        .or_else(|| user.company_id.clone())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("company_id is required")))?;
    require_same_company(user, &company_id)?;

    let company = state
        .store
        .find_company_by_id(&company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("company_not_found")))?;

    let employee = CompanyUser::new(
        company.id.clone(),
        req.first_name.trim().to_string(),
        req.last_name.trim().to_string(),
        Role::Employee,
    );
    state.store.insert_company_user(&employee).await?;
    tracing::info!(employee_id = %employee.id, company_id = %company.id, "Employee created");

    let (invitation, invitation_error) = match req.invited_email {
        None => (None, None),
        Some(invited_email) => {
            let issued = state
                .invitations
                .issue(NewInvitation {
                    employee_id: employee.id.clone(),
                    company_id: company.id.clone(),
                    company_name: company.name.clone(),
                    employee_name: employee.full_name(),
                    invited_email,
                    sent_by_user_id: user.id.clone(),
                })
                .await;
            match issued {
                Ok(invitation) => (Some(InvitationResponse::from(invitation)), None),
                Err(ServiceError::Email(_)) => (None, Some("email_failed".to_string())),
                Err(e) => return Err(e.into()),
            }
        }
    };

    let stored = state
        .store
        .find_company_user_by_id(&employee.id)
        .await?
        .unwrap_or(employee);

    Ok((
        StatusCode::CREATED,
        Json(CreateEmployeeResponse {
            employee: EmployeeResponse::from(stored),
            invitation,
            invitation_error,
        }),
    ))
}

/// List a company's managers and employees
#[utoipa::path(
    get,
    path = "/companies/{company_id}/employees",
    params(("company_id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company users", body = [EmployeeResponse]),
        (status = 401, description = "unauthenticated", body = ErrorResponse),
        (status = 403, description = "forbidden", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn list_employees(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<EmployeeResponse>>, AppError> {
    let user = current.require(&[Role::Manager])?;
    require_same_company(user, &company_id)?;

    let users = state.store.list_company_users(&company_id).await?;
    Ok(Json(users.into_iter().map(EmployeeResponse::from).collect()))
}
