use serde::{Deserialize, Serialize};

/// Credentials and resource identifiers for one user's Cloudflare account.
///
/// Built per request from the stored configuration and handed to
/// [`CloudflareClient::new`](super::CloudflareClient::new).
#[derive(Clone)]
pub struct CloudflareCredentials {
    pub api_token: String,
    pub account_id: String,
    pub zone_id: String,
    pub kv_namespace_id: String,
    pub worker_name: String,
}

impl std::fmt::Debug for CloudflareCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareCredentials")
            .field("api_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("zone_id", &self.zone_id)
            .field("kv_namespace_id", &self.kv_namespace_id)
            .field("worker_name", &self.worker_name)
            .finish()
    }
}

/// The v4 response envelope shared by every JSON endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStatus {
    pub id: String,
    pub status: String,
}

impl TokenStatus {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRoute {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub script: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// Route pattern that sends every request for `domain` to the worker
pub fn route_pattern(domain: &str) -> String {
    format!("*{}/*", domain)
}
