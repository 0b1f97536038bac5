//! Invitation lifecycle.
//!
//! ```text
//! pending -> accepted   accept() before expiry
//! pending -> expired    accept() at or after expiry
//! pending -> revoked    superseded by issue(), or its email could not be sent
//! ```
//!
//! Every transition out of `pending` is a conditional write on the stored
//! status, so two racing callers cannot both move the same invitation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Invitation, InvitationState, NewInvitation, UserInvitationStatus};
use crate::services::{
    metrics, token, AuthStore, EmailProvider, InvitationEmail, ServiceError, SessionService,
    UserDirectory,
};

/// Read-only view shown before the invitee commits.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvitationPreview {
    pub employee_name: String,
    pub company_name: String,
    pub invited_email: String,
    pub expires_at: DateTime<Utc>,
    /// Effective state: a pending invitation past its expiry reports `expired`.
    pub status: InvitationState,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcceptedInvitation {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn AuthStore>,
    directory: UserDirectory,
    sessions: SessionService,
    email: Arc<dyn EmailProvider>,
    frontend_url: String,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        directory: UserDirectory,
        sessions: SessionService,
        email: Arc<dyn EmailProvider>,
        frontend_url: String,
    ) -> Self {
        Self {
            store,
            directory,
            sessions,
            email,
            frontend_url,
        }
    }

    pub async fn issue(&self, params: NewInvitation) -> Result<Invitation, ServiceError> {
        self.issue_at(params, Utc::now()).await
    }

    /// Revoke any pending invitation for the target, create a fresh one and
    /// email it. If the email cannot be sent the new invitation is revoked and
    /// the target's invitation status is restored.
    #[tracing::instrument(skip_all, fields(employee_id = %params.employee_id))]
    pub async fn issue_at(
        &self,
        mut params: NewInvitation,
        now: DateTime<Utc>,
    ) -> Result<Invitation, ServiceError> {
        params.invited_email = params.invited_email.trim().to_lowercase();
        if params.invited_email.is_empty() || !params.invited_email.contains('@') {
            return Err(ServiceError::Validation("invited_email is invalid".to_string()));
        }

        let target = self
            .store
            .find_company_user_by_id(&params.employee_id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let previous_status = target.invitation_status;

        let revoked = self
            .store
            .revoke_pending_invitations(&params.employee_id)
            .await?;
        if revoked > 0 {
            tracing::info!(revoked, "Superseded pending invitations");
        }

        self.store
            .set_company_user_invitation_status(&target.id, UserInvitationStatus::Pending)
            .await?;

        let invitation = Invitation::new(params, token::generate_invitation_token(), now);
        self.store.insert_invitation(&invitation).await?;

        let message = InvitationEmail {
            employee_name: invitation.employee_name.clone(),
            company_name: invitation.company_name.clone(),
            accept_link: format!(
                "{}/accept-invitation?token={}",
                self.frontend_url, invitation.token
            ),
            expires_at: invitation.expires_at,
        };

        if let Err(e) = self
            .email
            .send_invitation_email(&invitation.invited_email, &message)
            .await
        {
            tracing::error!(invitation_id = %invitation.id, error = %e, "Invitation email failed, rolling back");
            metrics::record_invitation("email_failed");

            self.store
                .transition_invitation(&invitation.id, InvitationState::Revoked)
                .await?;
            let restored = match previous_status {
                UserInvitationStatus::Accepted => UserInvitationStatus::Accepted,
                _ => UserInvitationStatus::None,
            };
            self.store
                .set_company_user_invitation_status(&target.id, restored)
                .await?;

            return Err(ServiceError::Email(e.to_string()));
        }

        metrics::record_invitation("issued");
        tracing::info!(invitation_id = %invitation.id, "Invitation issued");
        Ok(invitation)
    }

    pub async fn validate(&self, token: &str) -> Result<InvitationPreview, ServiceError> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<InvitationPreview, ServiceError> {
        let invitation = self
            .store
            .find_invitation_by_token(token)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        let status = if invitation.status == InvitationState::Pending && invitation.is_expired_at(now)
        {
            InvitationState::Expired
        } else {
            invitation.status
        };

        Ok(InvitationPreview {
            is_valid: invitation.is_valid_at(now),
            employee_name: invitation.employee_name,
            company_name: invitation.company_name,
            invited_email: invitation.invited_email,
            expires_at: invitation.expires_at,
            status,
        })
    }

    pub async fn accept(&self, token: &str) -> Result<AcceptedInvitation, ServiceError> {
        self.accept_at(token, Utc::now()).await
    }

    /// Bind the invited address to the target user and open a session.
    ///
    /// The user is written before the invitation. If the process dies between
    /// the two writes the invitation is still pending and a retry completes
    /// it; the email collision check ignores the target user itself.
    #[tracing::instrument(skip_all)]
    pub async fn accept_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptedInvitation, ServiceError> {
        let invitation = self
            .store
            .find_invitation_by_token(token)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if invitation.status.is_terminal() {
            return Err(ServiceError::AlreadyProcessed(invitation.status));
        }

        if invitation.is_expired_at(now) {
            if !self
                .store
                .transition_invitation(&invitation.id, InvitationState::Expired)
                .await?
            {
                return Err(self.lost_transition(token).await);
            }
            metrics::record_invitation("expired");
            tracing::info!(invitation_id = %invitation.id, "Invitation expired on acceptance");
            return Err(ServiceError::Expired);
        }

        let accepted_email = invitation.invited_email.trim().to_lowercase();

        if self
            .directory
            .find_other_owner(&accepted_email, &invitation.employee_id)
            .await?
            .is_some()
        {
            tracing::warn!(invitation_id = %invitation.id, "Invited address already owned by another user");
            return Err(ServiceError::EmailInUse);
        }

        let target = self
            .store
            .find_company_user_by_id(&invitation.employee_id)
            .await?
            .ok_or_else(|| {
                tracing::error!(
                    invitation_id = %invitation.id,
                    employee_id = %invitation.employee_id,
                    "Invitation target is missing"
                );
                ServiceError::UserNotFound
            })?;

        self.store
            .bind_company_user_email(&target.id, &accepted_email, now)
            .await?;

        if !self
            .store
            .mark_invitation_accepted(&invitation.id, &accepted_email, now)
            .await?
        {
            return Err(self.lost_transition(token).await);
        }

        let session = self
            .sessions
            .create_at(&target.id, target.role, &accepted_email, now)
            .await?;

        metrics::record_invitation("accepted");
        tracing::info!(invitation_id = %invitation.id, user_id = %target.id, "Invitation accepted");

        Ok(AcceptedInvitation {
            session_token: session.token,
            expires_at: session.expires_at,
            user_id: target.id,
        })
    }

    /// A conditional write found the invitation no longer pending; report
    /// whatever state the other writer left it in.
    async fn lost_transition(&self, token: &str) -> ServiceError {
        match self.store.find_invitation_by_token(token).await {
            Ok(Some(current)) if current.status.is_terminal() => {
                ServiceError::AlreadyProcessed(current.status)
            }
            Ok(_) => ServiceError::Internal(anyhow::anyhow!(
                "invitation transition lost but invitation is still pending"
            )),
            Err(e) => e,
        }
    }
}
