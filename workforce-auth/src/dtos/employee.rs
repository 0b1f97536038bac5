use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::invitation::InvitationResponse;
use crate::models::{CompanyUser, Role, UserInvitationStatus};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployeeRequest {
    /// Defaults to the caller's company. Required for admins.
    pub company_id: Option<String>,

    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    #[schema(example = "Sam")]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    #[schema(example = "Lee")]
    pub last_name: String,

    /// When set, an invitation is issued to this address straight away.
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "sam.lee@example.com")]
    pub invited_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmployeeResponse {
    pub id: String,
    pub company_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub invitation_status: UserInvitationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<CompanyUser> for EmployeeResponse {
    fn from(user: CompanyUser) -> Self {
        Self {
            id: user.id,
            company_id: user.company_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            invitation_status: user.invitation_status,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateEmployeeResponse {
    pub employee: EmployeeResponse,
    pub invitation: Option<InvitationResponse>,
    /// Set when the employee was created but the invitation could not be sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitation_error: Option<String>,
}
