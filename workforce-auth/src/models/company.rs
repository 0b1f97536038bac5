use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tenant record. Only the name is read by this service, for display.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
