use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::AuthStore;
use crate::models::{
    AdminRecord, Company, CompanyUser, Invitation, InvitationState, MagicLink, Role, Session,
    UserInvitationStatus,
};
use crate::services::ServiceError;

#[derive(Default)]
struct Collections {
    sessions: HashMap<String, Session>,
    magic_links: HashMap<String, MagicLink>,
    invitations: HashMap<String, Invitation>,
    admins: HashMap<String, AdminRecord>,
    company_users: HashMap<String, CompanyUser>,
    companies: HashMap<String, Company>,
    /// Served once by `find_invitation_by_token` ahead of the stored copy.
    stale_invitations: Vec<Invitation>,
}

/// In-memory [`AuthStore`]. Conditional updates are applied under one lock so
/// they behave like single-document atomic writes.
#[derive(Default)]
pub struct MockStore {
    inner: Mutex<Collections>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, ServiceError> {
        self.inner
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Mock store mutex poisoned: {}", e)))
    }

    pub fn seed_admin(&self, admin: AdminRecord) {
        if let Ok(mut c) = self.lock() {
            c.admins.insert(admin.id.clone(), admin);
        }
    }

    pub fn seed_company(&self, company: Company) {
        if let Ok(mut c) = self.lock() {
            c.companies.insert(company.id.clone(), company);
        }
    }

    pub fn seed_company_user(&self, user: CompanyUser) {
        if let Ok(mut c) = self.lock() {
            c.company_users.insert(user.id.clone(), user);
        }
    }

    pub fn seed_invitation(&self, invitation: Invitation) {
        if let Ok(mut c) = self.lock() {
            c.invitations.insert(invitation.id.clone(), invitation);
        }
    }

    pub fn remove_company_user(&self, id: &str) {
        if let Ok(mut c) = self.lock() {
            c.company_users.remove(id);
        }
    }

    /// Make the next token lookup for this invitation return `snapshot`
    /// while the stored copy keeps moving, as a concurrent writer would.
    pub fn stage_stale_invitation_read(&self, snapshot: Invitation) {
        if let Ok(mut c) = self.lock() {
            c.stale_invitations.push(snapshot);
        }
    }

    pub fn seed_magic_link(&self, link: MagicLink) {
        if let Ok(mut c) = self.lock() {
            c.magic_links.insert(link.id.clone(), link);
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().map(|c| c.sessions.len()).unwrap_or(0)
    }

    pub fn sessions_for_user(&self, user_id: &str) -> Vec<Session> {
        self.lock()
            .map(|c| {
                c.sessions
                    .values()
                    .filter(|s| s.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn magic_links_for(&self, email: &str) -> Vec<MagicLink> {
        self.lock()
            .map(|c| {
                c.magic_links
                    .values()
                    .filter(|l| l.email == email)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn invitation(&self, id: &str) -> Option<Invitation> {
        self.lock().ok()?.invitations.get(id).cloned()
    }

    pub fn company_user(&self, id: &str) -> Option<CompanyUser> {
        self.lock().ok()?.company_users.get(id).cloned()
    }
}

#[async_trait]
impl AuthStore for MockStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), ServiceError> {
        self.lock()?
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_session_by_token(&self, token: &str) -> Result<Option<Session>, ServiceError> {
        Ok(self
            .lock()?
            .sessions
            .values()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn touch_session(
        &self,
        session_id: &str,
        last_used_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if let Some(session) = self.lock()?.sessions.get_mut(session_id) {
            session.last_used_at = last_used_at;
        }
        Ok(())
    }

    async fn insert_magic_link(&self, link: &MagicLink) -> Result<(), ServiceError> {
        self.lock()?
            .magic_links
            .insert(link.id.clone(), link.clone());
        Ok(())
    }

    async fn find_magic_link_by_token(
        &self,
        token: &str,
    ) -> Result<Option<MagicLink>, ServiceError> {
        Ok(self
            .lock()?
            .magic_links
            .values()
            .find(|l| l.token == token)
            .cloned())
    }

    async fn consume_magic_link(
        &self,
        link_id: &str,
        used_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let mut c = self.lock()?;
        match c.magic_links.get_mut(link_id) {
            Some(link) if link.used_at.is_none() => {
                link.used_at = Some(used_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<(), ServiceError> {
        self.lock()?
            .invitations
            .insert(invitation.id.clone(), invitation.clone());
        Ok(())
    }

    async fn find_invitation_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Invitation>, ServiceError> {
        let mut c = self.lock()?;
        if let Some(pos) = c.stale_invitations.iter().position(|i| i.token == token) {
            return Ok(Some(c.stale_invitations.remove(pos)));
        }
        Ok(c.invitations.values().find(|i| i.token == token).cloned())
    }

    async fn find_invitations_for_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<Invitation>, ServiceError> {
        let mut found: Vec<Invitation> = self
            .lock()?
            .invitations
            .values()
            .filter(|i| i.employee_id == employee_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn revoke_pending_invitations(&self, employee_id: &str) -> Result<u64, ServiceError> {
        let mut revoked = 0;
        for invitation in self.lock()?.invitations.values_mut() {
            if invitation.employee_id == employee_id
                && invitation.status == InvitationState::Pending
            {
                invitation.status = InvitationState::Revoked;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn transition_invitation(
        &self,
        invitation_id: &str,
        to: InvitationState,
    ) -> Result<bool, ServiceError> {
        let mut c = self.lock()?;
        match c.invitations.get_mut(invitation_id) {
            Some(inv) if inv.status == InvitationState::Pending => {
                inv.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_invitation_accepted(
        &self,
        invitation_id: &str,
        accepted_email: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let mut c = self.lock()?;
        match c.invitations.get_mut(invitation_id) {
            Some(inv) if inv.status == InvitationState::Pending => {
                inv.status = InvitationState::Accepted;
                inv.accepted_email = Some(accepted_email.to_string());
                inv.accepted_at = Some(accepted_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminRecord>, ServiceError> {
        Ok(self
            .lock()?
            .admins
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_company_user_by_email(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<CompanyUser>, ServiceError> {
        Ok(self
            .lock()?
            .company_users
            .values()
            .find(|u| u.role == role && u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_company_users_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<CompanyUser>, ServiceError> {
        Ok(self
            .lock()?
            .company_users
            .values()
            .filter(|u| u.email.as_deref() == Some(email))
            .cloned()
            .collect())
    }

    async fn find_company_user_by_id(&self, id: &str) -> Result<Option<CompanyUser>, ServiceError> {
        Ok(self.lock()?.company_users.get(id).cloned())
    }

    async fn insert_company_user(&self, user: &CompanyUser) -> Result<(), ServiceError> {
        self.lock()?
            .company_users
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_company_users(
        &self,
        company_id: &str,
    ) -> Result<Vec<CompanyUser>, ServiceError> {
        let mut users: Vec<CompanyUser> = self
            .lock()?
            .company_users
            .values()
            .filter(|u| u.company_id == company_id)
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });
        Ok(users)
    }

    async fn set_company_user_invitation_status(
        &self,
        user_id: &str,
        status: UserInvitationStatus,
    ) -> Result<(), ServiceError> {
        if let Some(user) = self.lock()?.company_users.get_mut(user_id) {
            user.invitation_status = status;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn bind_company_user_email(
        &self,
        user_id: &str,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if let Some(user) = self.lock()?.company_users.get_mut(user_id) {
            user.email = Some(email.to_string());
            user.invitation_status = UserInvitationStatus::Accepted;
            user.updated_at = at;
        }
        Ok(())
    }

    async fn find_company_by_id(&self, id: &str) -> Result<Option<Company>, ServiceError> {
        Ok(self.lock()?.companies.get(id).cloned())
    }

    async fn list_companies(&self) -> Result<Vec<Company>, ServiceError> {
        let mut companies: Vec<Company> = self.lock()?.companies.values().cloned().collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }
}
