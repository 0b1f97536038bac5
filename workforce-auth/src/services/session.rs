use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{Role, Session};
use crate::services::{metrics, token, AuthStore, ServiceError};

/// Creates and validates bearer sessions.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn AuthStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user_id: &str,
        user_type: Role,
        email: &str,
    ) -> Result<Session, ServiceError> {
        self.create_at(user_id, user_type, email, Utc::now()).await
    }

    #[tracing::instrument(skip(self, email))]
    pub async fn create_at(
        &self,
        user_id: &str,
        user_type: Role,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, ServiceError> {
        let session = Session::new(
            user_id.to_string(),
            user_type,
            email,
            token::generate_session_token(),
            now,
        );
        self.store.insert_session(&session).await?;

        metrics::record_session_created(user_type);
        tracing::info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>, ServiceError> {
        self.store.find_session_by_token(token).await
    }

    /// Look up a live session and refresh its `last_used_at`.
    pub async fn validate(&self, token: &str) -> Result<Option<Session>, ServiceError> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, ServiceError> {
        let Some(mut session) = self.store.find_session_by_token(token).await? else {
            return Ok(None);
        };

        if session.is_expired_at(now) {
            tracing::debug!(session_id = %session.id, "Session expired");
            return Ok(None);
        }

        self.store.touch_session(&session.id, now).await?;
        session.last_used_at = now;
        Ok(Some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockStore;
    use chrono::Duration;

    fn service() -> SessionService {
        SessionService::new(Arc::new(MockStore::new()))
    }

    #[tokio::test]
    async fn valid_until_expiry_then_rejected() {
        let sessions = service();
        let start = Utc::now();
        let session = sessions
            .create_at("u1", Role::Employee, "u1@acme.test", start)
            .await
            .unwrap();

        let just_before = session.expires_at - Duration::seconds(1);
        assert!(sessions
            .validate_at(&session.token, just_before)
            .await
            .unwrap()
            .is_some());
        assert!(sessions
            .validate_at(&session.token, session.expires_at)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn validation_records_last_use_without_moving_expiry() {
        let sessions = service();
        let start = Utc::now();
        let session = sessions
            .create_at("u1", Role::Manager, "m@acme.test", start)
            .await
            .unwrap();

        let mut previous = session.last_used_at;
        for minutes in [1, 5, 60] {
            let now = start + Duration::minutes(minutes);
            let refreshed = sessions
                .validate_at(&session.token, now)
                .await
                .unwrap()
                .unwrap();
            assert!(refreshed.last_used_at >= previous);
            assert_eq!(refreshed.expires_at, session.expires_at);
            previous = refreshed.last_used_at;
        }

        let stored = sessions.get_by_token(&session.token).await.unwrap().unwrap();
        assert_eq!(stored.last_used_at, previous);
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        assert!(service().validate("missing").await.unwrap().is_none());
    }
}
