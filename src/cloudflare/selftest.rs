use serde::Serialize;

use super::client::CloudflareApi;
use super::error::CloudflareError;
use super::script::placeholder_script;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityReport {
    pub success: bool,
    pub checks: Vec<CheckResult>,
}

impl ConnectivityReport {
    /// Message of the first failed check
    pub fn failure(&self) -> Option<&str> {
        self.checks
            .iter()
            .find(|c| c.status == CheckStatus::Failed)
            .map(|c| c.message.as_str())
    }
}

const CHECKS: [&str; 5] = ["token", "account", "zone", "kv_namespace", "worker"];

/// Verify the credentials can reach every resource the deployer touches.
///
/// Stops at the first failure; later checks are reported as skipped. A
/// missing worker script is created from a placeholder.
pub async fn run_connectivity_test(api: &dyn CloudflareApi) -> ConnectivityReport {
    let mut checks = Vec::with_capacity(CHECKS.len());

    for name in CHECKS {
        let outcome = match name {
            "token" => check_token(api).await,
            "account" => api.get_account().await.map(|_| "Account accessible".to_string()),
            "zone" => api.get_zone().await.map(|_| "Zone accessible".to_string()),
            "kv_namespace" => api
                .get_kv_namespace()
                .await
                .map(|_| "KV namespace accessible".to_string()),
            _ => check_worker(api).await,
        };

        match outcome {
            Ok(message) => checks.push(CheckResult {
                name,
                status: CheckStatus::Success,
                message,
            }),
            Err(e) => {
                tracing::warn!("Cloudflare connectivity check '{}' failed: {}", name, e);
                checks.push(CheckResult {
                    name,
                    status: CheckStatus::Failed,
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    for name in CHECKS.iter().skip(checks.len()) {
        checks.push(CheckResult {
            name: *name,
            status: CheckStatus::Skipped,
            message: "Skipped after earlier failure".to_string(),
        });
    }

    ConnectivityReport {
        success: checks.iter().all(|c| c.status == CheckStatus::Success),
        checks,
    }
}

async fn check_token(api: &dyn CloudflareApi) -> Result<String, CloudflareError> {
    let token = api.verify_token().await?;
    if token.is_active() {
        Ok("API token is valid".to_string())
    } else {
        Err(CloudflareError::configuration(format!(
            "API token status is '{}'",
            token.status
        )))
    }
}

async fn check_worker(api: &dyn CloudflareApi) -> Result<String, CloudflareError> {
    let name = api.worker_name();
    if api.script_exists(name).await? {
        return Ok(format!("Worker '{}' exists", name));
    }
    api.upload_script(name, placeholder_script()).await?;
    tracing::info!("Created placeholder worker script '{}'", name);
    Ok(format!("Worker '{}' was missing and has been created", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloudflare, Operation};

    #[tokio::test]
    async fn all_checks_pass_and_missing_worker_is_created() {
        let fake = FakeCloudflare::new();
        let report = run_connectivity_test(&fake).await;

        assert!(report.success);
        assert_eq!(report.checks.len(), 5);
        assert!(report.checks[4].message.contains("created"));
        assert_eq!(fake.script("maintenance-worker").as_deref(), Some(placeholder_script()));
    }

    #[tokio::test]
    async fn existing_worker_is_left_alone() {
        let fake = FakeCloudflare::new();
        fake.upload_script("maintenance-worker", "custom").await.unwrap();

        let report = run_connectivity_test(&fake).await;
        assert!(report.success);
        assert_eq!(fake.script("maintenance-worker").as_deref(), Some("custom"));
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let fake = FakeCloudflare::new();
        fake.fail_on(Operation::GetZone);

        let report = run_connectivity_test(&fake).await;
        assert!(!report.success);
        let statuses: Vec<CheckStatus> = report.checks.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![
                CheckStatus::Success,
                CheckStatus::Success,
                CheckStatus::Failed,
                CheckStatus::Skipped,
                CheckStatus::Skipped
            ]
        );
        assert!(report.failure().is_some());
        assert!(fake.script("maintenance-worker").is_none());
    }

    #[tokio::test]
    async fn inactive_token_fails_first_check() {
        let fake = FakeCloudflare::new();
        fake.set_token_status("disabled");

        let report = run_connectivity_test(&fake).await;
        assert_eq!(report.checks[0].status, CheckStatus::Failed);
        assert!(report.failure().unwrap().contains("disabled"));
    }
}
