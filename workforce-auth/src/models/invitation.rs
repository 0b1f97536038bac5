//! Invitation model - lets a pre-provisioned, emailless employee claim an address.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const INVITATION_TTL_DAYS: i64 = 7;

/// Invitation state codes. Everything but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InvitationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationState::Pending => "pending",
            InvitationState::Accepted => "accepted",
            InvitationState::Expired => "expired",
            InvitationState::Revoked => "revoked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationState::Pending)
    }
}

impl std::fmt::Display for InvitationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invitation entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "_id")]
    pub id: String,
    pub token: String,
    pub employee_id: String,
    pub company_id: String,
    pub company_name: String,
    pub employee_name: String,
    pub invited_email: String,
    pub status: InvitationState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_email: Option<String>,
    pub sent_by_user_id: String,
}

/// Everything `issue` needs to know about the target and the issuer.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub employee_id: String,
    pub company_id: String,
    pub company_name: String,
    pub employee_name: String,
    pub invited_email: String,
    pub sent_by_user_id: String,
}

impl Invitation {
    pub fn new(params: NewInvitation, token: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token,
            employee_id: params.employee_id,
            company_id: params.company_id,
            company_name: params.company_name,
            employee_name: params.employee_name,
            invited_email: params.invited_email,
            status: InvitationState::Pending,
            created_at: now,
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
            accepted_at: None,
            accepted_email: None,
            sent_by_user_id: params.sent_by_user_id,
        }
    }

    /// Pending and inside its validity window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationState::Pending && !self.is_expired_at(now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
