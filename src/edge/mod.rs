//! Request-time behaviour of the edge worker.
//!
//! The KV namespace holds one [`EdgeRecord`] per domain. [`respond`] turns
//! the stored value for a host into the reply the worker serves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::page::{Design, MaintenancePage, PageStatus};
use crate::render::render_page;

/// Page projection stored in KV under the page's domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub status: PageStatus,
    pub domain: String,
    #[serde(default)]
    pub design: Design,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EdgeRecord {
    pub fn from_page(page: &MaintenancePage) -> Self {
        Self {
            title: page.title.clone(),
            description: page.description.clone(),
            content: page.content.clone(),
            status: page.status,
            domain: page.domain.clone(),
            design: page.design.0.clone(),
            is_active: page.status == PageStatus::Published,
            original_url: None,
            updated_at: Some(page.updated_at),
        }
    }

    /// Merge a new status into an existing record; `isActive` follows it
    pub fn with_status(mut self, status: PageStatus) -> Self {
        self.status = status;
        self.is_active = status == PageStatus::Published;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeReply {
    Page(String),
    Redirect(String),
    NotFound,
    Invalid,
}

/// Resolve the reply for `host` given the raw KV value stored for it
pub fn respond(host: &str, stored: Option<&str>) -> EdgeReply {
    let Some(raw) = stored else {
        return EdgeReply::NotFound;
    };
    let record: EdgeRecord = match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(_) => return EdgeReply::Invalid,
    };
    if !record.is_active {
        let target = record
            .original_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("https://{}", host));
        return EdgeReply::Redirect(target);
    }
    EdgeReply::Page(render_page(&record))
}

/// Strip any port and lowercase the `Host` header value
pub fn normalize_host(host: &str) -> String {
    host.split(':').next().unwrap_or_default().trim().to_ascii_lowercase()
}
