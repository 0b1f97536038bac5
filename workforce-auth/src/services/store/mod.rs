//! Document store for sessions, magic links, invitations and identity records.
//!
//! [`AuthStore`] is the seam the services depend on. [`MongoStore`] backs
//! production; [`MockStore`] keeps everything in memory for tests.

mod mock;
mod mongo;

pub use mock::MockStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    AdminRecord, Company, CompanyUser, Invitation, InvitationState, MagicLink, Role, Session,
    UserInvitationStatus,
};
use crate::services::ServiceError;

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;

    async fn insert_session(&self, session: &Session) -> Result<(), ServiceError>;
    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, ServiceError>;
    async fn touch_session(
        &self,
        session_id: &str,
        last_used_at: DateTime<Utc>,
    ) -> Result<(), ServiceError>;

    async fn insert_magic_link(&self, link: &MagicLink) -> Result<(), ServiceError>;
    async fn find_magic_link_by_token(&self, token: &str)
        -> Result<Option<MagicLink>, ServiceError>;
    /// Set `used_at` on a link that has not been used yet. Returns `false` when
    /// another caller consumed it first.
    async fn consume_magic_link(
        &self,
        link_id: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError>;

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<(), ServiceError>;
    async fn find_invitation_by_token(&self, token: &str)
        -> Result<Option<Invitation>, ServiceError>;
    async fn find_invitations_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<Invitation>, ServiceError>;
    /// Move every pending invitation of `employee_id` to revoked.
    async fn revoke_pending_invitations(&self, employee_id: &str) -> Result<u64, ServiceError>;
    /// Move a pending invitation to `to`. Returns `false` if it was no longer pending.
    async fn transition_invitation(
        &self,
        invitation_id: &str,
        to: InvitationState,
    ) -> Result<bool, ServiceError>;
    /// Pending to accepted, recording who and when. Returns `false` if it was no longer pending.
    async fn mark_invitation_accepted(
        &self,
        invitation_id: &str,
        accepted_email: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError>;

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminRecord>, ServiceError>;
    async fn find_company_user_by_email(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<CompanyUser>, ServiceError>;
    async fn find_company_users_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<CompanyUser>, ServiceError>;
    async fn find_company_user_by_id(&self, id: &str) -> Result<Option<CompanyUser>, ServiceError>;
    async fn insert_company_user(&self, user: &CompanyUser) -> Result<(), ServiceError>;
    async fn list_company_users(&self, company_id: &str)
        -> Result<Vec<CompanyUser>, ServiceError>;
    async fn set_company_user_invitation_status(
        &self,
        user_id: &str,
        status: UserInvitationStatus,
    ) -> Result<(), ServiceError>;
    /// Bind `email` to the user and mark their invitation accepted.
    async fn bind_company_user_email(
        &self,
        user_id: &str,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError>;

    async fn find_company_by_id(&self, id: &str) -> Result<Option<Company>, ServiceError>;
    async fn list_companies(&self) -> Result<Vec<Company>, ServiceError>;
}
