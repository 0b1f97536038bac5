use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Invitation, InvitationState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IssueInvitationRequest {
    #[validate(length(min = 1, message = "employee_id is required"))]
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub employee_id: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "sam.lee@example.com")]
    pub invited_email: String,
}

/// Invitation as shown to the issuer. The token only travels by email.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InvitationResponse {
    pub id: String,
    pub employee_id: String,
    pub company_id: String,
    pub invited_email: String,
    pub status: InvitationState,
    pub expires_at: DateTime<Utc>,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id,
            employee_id: invitation.employee_id,
            company_id: invitation.company_id,
            invited_email: invitation.invited_email,
            status: invitation.status,
            expires_at: invitation.expires_at,
        }
    }
}
