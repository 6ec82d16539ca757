use thiserror::Error;

/// Errors raised by the Cloudflare client and the deployment pipeline.
///
/// The step variants (`KvWrite`, `WorkerDeploy`, `Route`, ...) wrap the
/// underlying client failure so callers can tell which part of a
/// multi-step operation broke.
#[derive(Debug, Error)]
pub enum CloudflareError {
    #[error("Cloudflare configuration error: {0}")]
    Configuration(String),

    #[error("Failed to write page data to KV: {0}")]
    KvWrite(String),

    #[error("Failed to read page data from KV: {0}")]
    KvRead(String),

    #[error("Failed to delete page data from KV: {0}")]
    KvDelete(String),

    #[error("Failed to deploy worker script: {0}")]
    WorkerDeploy(String),

    #[error("Failed to update worker route: {0}")]
    Route(String),

    #[error("Failed to update DNS records: {0}")]
    Dns(String),

    #[error("Cloudflare API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CloudflareError {
    pub fn configuration(message: impl Into<String>) -> Self {
        CloudflareError::Configuration(message.into())
    }

    /// HTTP status reported by Cloudflare, if this is an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudflareError::Api { status, .. } => Some(*status),
            CloudflareError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
