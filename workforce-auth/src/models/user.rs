//! Identity records and the per-request authenticated view.
//!
//! Administrators and company users live in separate collections with no
//! shared supertype in storage; [`Identity`] is the tagged union over them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Role, Session};

/// Platform administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Older admin documents have no role field.
    #[serde(default)]
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

/// Whether a company user has been invited to claim an email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserInvitationStatus {
    #[default]
    None,
    Pending,
    Accepted,
}

impl UserInvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserInvitationStatus::None => "none",
            UserInvitationStatus::Pending => "pending",
            UserInvitationStatus::Accepted => "accepted",
        }
    }
}

/// Manager or employee belonging to a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompanyUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub company_id: String,
    /// Employees are provisioned without an address and get one on invitation acceptance.
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub invitation_status: UserInvitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyUser {
    /// Provision a company user with no email yet.
    pub fn new(company_id: String, first_name: String, last_name: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            company_id,
            email: None,
            first_name,
            last_name,
            role,
            invitation_status: UserInvitationStatus::None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone)]
pub enum Identity {
    Admin(AdminRecord),
    CompanyUser(CompanyUser),
}

impl Identity {
    pub fn id(&self) -> &str {
        match self {
            Identity::Admin(a) => &a.id,
            Identity::CompanyUser(u) => &u.id,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            Identity::Admin(a) => Some(&a.email),
            Identity::CompanyUser(u) => u.email.as_deref(),
        }
    }

    pub fn first_name(&self) -> &str {
        match self {
            Identity::Admin(a) => &a.first_name,
            Identity::CompanyUser(u) => &u.first_name,
        }
    }

    pub fn last_name(&self) -> &str {
        match self {
            Identity::Admin(a) => &a.last_name,
            Identity::CompanyUser(u) => &u.last_name,
        }
    }

    /// Explicit role on the record, if it carries one.
    pub fn role(&self) -> Option<Role> {
        match self {
            Identity::Admin(a) => a.role,
            Identity::CompanyUser(u) => Some(u.role),
        }
    }

    pub fn company_id(&self) -> Option<&str> {
        match self {
            Identity::Admin(_) => None,
            Identity::CompanyUser(u) => Some(&u.company_id),
        }
    }
}

/// Identity attached to a request after the bearer token has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub company_id: Option<String>,
    pub user_type: Role,
}

impl AuthenticatedUser {
    /// Combine the owning record with its session. The record's own role wins;
    /// the session's user type fills in when the record has none.
    pub fn from_identity(identity: &Identity, session: &Session) -> Self {
        Self {
            id: identity.id().to_string(),
            email: session.email.clone(),
            first_name: identity.first_name().to_string(),
            last_name: identity.last_name().to_string(),
            role: identity.role().unwrap_or(session.user_type),
            company_id: identity.company_id().map(str::to_string),
            user_type: session.user_type,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
