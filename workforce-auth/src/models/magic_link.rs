use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAGIC_LINK_TTL_MINUTES: i64 = 15;

/// One-time emailed login credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLink {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl MagicLink {
    pub fn new(email: &str, token: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            token,
            created_at: now,
            expires_at: now + Duration::minutes(MAGIC_LINK_TTL_MINUTES),
            used_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}
