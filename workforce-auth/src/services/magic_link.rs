//! Passwordless login: an emailed, single-use link exchanged for a session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Identity, MagicLink, Role};
use crate::services::{
    metrics, token, AuthStore, EmailProvider, ServiceError, SessionService, UserDirectory,
};

/// Profile returned to the client after a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub user_type: Role,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MagicLinkLogin {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct MagicLinkService {
    store: Arc<dyn AuthStore>,
    directory: UserDirectory,
    sessions: SessionService,
    email: Arc<dyn EmailProvider>,
    frontend_url: String,
}

impl MagicLinkService {
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

    pub async fn request(&self, email: &str) -> Result<(), ServiceError> {
        self.request_at(email, Utc::now()).await
    }

    /// Issue and email a link if `email` belongs to a known user.
    ///
    /// Unknown addresses and transport failures are indistinguishable from
    /// success to the caller, so the endpoint cannot be used to probe for
    /// accounts.
    #[tracing::instrument(skip_all)]
    pub async fn request_at(&self, email: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation("email is invalid".to_string()));
        }

        if self.directory.lookup(&email).await?.is_none() {
            tracing::debug!("Magic link requested for unknown address");
            return Ok(());
        }

        let link = MagicLink::new(&email, token::generate_magic_link_token(), now);
        self.store.insert_magic_link(&link).await?;

        let url = format!("{}/auth/verify?token={}", self.frontend_url, link.token);
        match self.email.send_magic_link_email(&email, &url).await {
            Ok(()) => {
                metrics::record_magic_link_issued();
                tracing::info!(magic_link_id = %link.id, "Magic link issued");
            }
            Err(e) => {
                tracing::error!(magic_link_id = %link.id, error = %e, "Failed to send magic link email");
            }
        }

        Ok(())
    }

    pub async fn verify(&self, token: &str) -> Result<MagicLinkLogin, ServiceError> {
        self.verify_at(token, Utc::now()).await
    }

    #[tracing::instrument(skip_all)]
    pub async fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<MagicLinkLogin, ServiceError> {
        let link = self
            .store
            .find_magic_link_by_token(token)
            .await?
            .ok_or(ServiceError::InvalidToken)?;

        if link.is_expired_at(now) {
            return Err(ServiceError::Expired);
        }
        if link.is_used() {
            return Err(ServiceError::AlreadyUsed);
        }

        // Conditional on used_at still being unset; a concurrent verify loses here.
        if !self.store.consume_magic_link(&link.id, now).await? {
            return Err(ServiceError::AlreadyUsed);
        }

        let entry = self
            .directory
            .lookup(&link.email)
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        let session = self
            .sessions
            .create_at(entry.identity.id(), entry.user_type(), &link.email, now)
            .await?;

        let company_name = match entry.identity.company_id() {
            Some(company_id) => self
                .store
                .find_company_by_id(company_id)
                .await?
                .map(|c| c.name),
            None => None,
        };

        tracing::info!(user_id = %entry.identity.id(), "Magic link verified");

        Ok(MagicLinkLogin {
            session_token: session.token,
            expires_at: session.expires_at,
            user: profile(&entry.identity, &session.email, session.user_type, company_name),
        })
    }
}

fn profile(
    identity: &Identity,
    email: &str,
    user_type: Role,
    company_name: Option<String>,
) -> UserProfile {
    UserProfile {
        id: identity.id().to_string(),
        email: email.to_string(),
        first_name: identity.first_name().to_string(),
        last_name: identity.last_name().to_string(),
        role: identity.role().unwrap_or(user_type),
        company_id: identity.company_id().map(str::to_string),
        company_name,
        user_type,
    }
}
