//! Session model - one logged-in client bound to an opaque bearer token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Sessions live for a fixed 30 days; use does not extend them.
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub user_type: Role,
    pub email: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: String, user_type: Role, email: &str, token: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            user_type,
            email: email.to_lowercase(),
            token,
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
            last_used_at: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_fixed_ttl_from_creation() {
        let now = Utc::now();
        let session = Session::new("u1".into(), Role::Employee, "A@B.com", "t".into(), now);

        assert_eq!(session.expires_at - session.created_at, Duration::days(30));
        assert_eq!(session.email, "a@b.com");
        assert!(!session.is_expired_at(session.expires_at - Duration::seconds(1)));
        assert!(session.is_expired_at(session.expires_at));
    }
}
