use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored Cloudflare settings for one user, without the API token.
///
/// The token is only read by the credential loader and is never part of
/// this struct.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CloudflareConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub account_id: String,
    pub zone_id: String,
    pub kv_namespace_id: String,
    pub worker_name: String,
    pub is_active: bool,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row used when building credentials; includes the token
#[derive(FromRow)]
pub struct CloudflareSecretRow {
    pub api_token: Option<String>,
    pub account_id: String,
    pub zone_id: String,
    pub kv_namespace_id: String,
    pub worker_name: String,
}
