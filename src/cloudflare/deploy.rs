use serde::Serialize;

use super::client::CloudflareApi;
use super::error::CloudflareError;
use super::locks::DomainLocks;
use super::script::worker_script;
use super::types::route_pattern;
use crate::database::models::page::{MaintenancePage, PageStatus};
use crate::edge::EdgeRecord;
use crate::render::render_page;

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub domain: String,
    pub worker_name: String,
    pub route_pattern: String,
    pub route_id: String,
    pub route_created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub domain: String,
    pub status: PageStatus,
    pub is_active: bool,
    pub route_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TeardownReport {
    pub domain: String,
    /// Whether a KV value existed before deletion
    pub kv_existed: bool,
    pub route_removed: bool,
    pub dns_records_removed: usize,
    pub warnings: Vec<String>,
}

/// Runs the edge deployment steps for one set of credentials.
///
/// Steps are sequential and not transactional. A failure after the KV write
/// leaves the KV value in place; re-running the operation converges.
pub struct Deployer<'a> {
    api: &'a dyn CloudflareApi,
    locks: &'a DomainLocks,
}

impl<'a> Deployer<'a> {
    pub fn new(api: &'a dyn CloudflareApi, locks: &'a DomainLocks) -> Self {
        Self { api, locks }
    }

    /// Write KV, replace the worker script, then upsert the route
    pub async fn deploy(&self, page: &MaintenancePage) -> Result<DeployReport, CloudflareError> {
        let _guard = self.locks.acquire(&page.domain).await;
        let record = EdgeRecord::from_page(page);

        self.write_record(&record).await?;
        tracing::info!("Wrote KV record for {}", page.domain);

        self.deploy_script(&render_page(&record)).await?;
        tracing::info!("Deployed worker script '{}' for {}", self.api.worker_name(), page.domain);

        let (route_id, route_created) = self.upsert_route(&page.domain).await?;
        tracing::info!(
            "Route {} for {} ({})",
            if route_created { "created" } else { "updated" },
            page.domain,
            route_id
        );

        Ok(DeployReport {
            domain: page.domain.clone(),
            worker_name: self.api.worker_name().to_string(),
            route_pattern: route_pattern(&page.domain),
            route_id,
            route_created,
        })
    }

    /// Merge `status` into the stored record and attach or detach the route.
    ///
    /// Only the KV read and write are fatal; the route step is best-effort
    /// and its outcome is reported.
    pub async fn set_activation(
        &self,
        page: &MaintenancePage,
        status: PageStatus,
    ) -> Result<ActivationReport, CloudflareError> {
        let _guard = self.locks.acquire(&page.domain).await;

        let stored = self
            .api
            .kv_get(&page.domain)
            .await
            .map_err(|e| CloudflareError::KvRead(e.to_string()))?;
        let parsed = stored
            .as_deref()
            .map(|raw| serde_json::from_str::<EdgeRecord>(raw));
        let current = match parsed {
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                tracing::warn!("Stored KV record for {} is unreadable, rebuilding: {}", page.domain, e);
                EdgeRecord::from_page(page)
            }
            None => EdgeRecord::from_page(page),
        };
        let record = current.with_status(status);
        self.write_record(&record).await?;

        let route_result = if record.is_active {
            self.upsert_route(&page.domain).await.map(|_| ())
        } else {
            self.remove_route(&page.domain).await.map(|_| ())
        };
        let route_error = match route_result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Route update for {} failed: {}", page.domain, e);
                Some(e.to_string())
            }
        };

        Ok(ActivationReport {
            domain: page.domain.clone(),
            status,
            is_active: record.is_active,
            route_updated: route_error.is_none(),
            route_error,
        })
    }

    /// Re-write the KV projection after a content edit
    pub async fn sync_content(&self, page: &MaintenancePage) -> Result<(), CloudflareError> {
        let _guard = self.locks.acquire(&page.domain).await;
        self.write_record(&EdgeRecord::from_page(page)).await
    }

    /// Remove the KV value, then the route and CNAME records.
    ///
    /// Only the KV deletion is fatal. A missing key counts as success.
    pub async fn teardown(&self, domain: &str) -> Result<TeardownReport, CloudflareError> {
        let _guard = self.locks.acquire(domain).await;
        let mut report = TeardownReport {
            domain: domain.to_string(),
            ..TeardownReport::default()
        };

        match self.api.kv_get(domain).await {
            Ok(Some(_)) => tracing::info!("Found KV record for {} before teardown", domain),
            Ok(None) => tracing::info!("No KV record for {}", domain),
            Err(e) => tracing::warn!("Could not read KV record for {}: {}", domain, e),
        }

        report.kv_existed = self
            .api
            .kv_delete(domain)
            .await
            .map_err(|e| CloudflareError::KvDelete(e.to_string()))?;

        match self.remove_route(domain).await {
            Ok(removed) => report.route_removed = removed,
            Err(e) => {
                tracing::warn!("Route teardown for {} failed: {}", domain, e);
                report.warnings.push(e.to_string());
            }
        }

        match self.remove_dns_records(domain).await {
            Ok(count) => report.dns_records_removed = count,
            Err(e) => {
                tracing::warn!("DNS teardown for {} failed: {}", domain, e);
                report.warnings.push(e.to_string());
            }
        }

        tracing::info!("Tore down edge deployment for {}", domain);
        Ok(report)
    }

    async fn write_record(&self, record: &EdgeRecord) -> Result<(), CloudflareError> {
        let value = serde_json::to_string(record)?;
        self.api
            .kv_put(&record.domain, &value)
            .await
            .map_err(|e| CloudflareError::KvWrite(e.to_string()))
    }

    async fn deploy_script(&self, html: &str) -> Result<(), CloudflareError> {
        let name = self.api.worker_name();
        let step = |e: CloudflareError| CloudflareError::WorkerDeploy(e.to_string());

        let script = worker_script(html)?;
        if !self.api.delete_script(name).await.map_err(step)? {
            tracing::debug!("No existing worker script '{}' to replace", name);
        }
        self.api.upload_script(name, &script).await.map_err(step)?;
        self.api.bind_kv_namespace(name).await.map_err(step)?;
        Ok(())
    }

    /// Returns the route id and whether it was newly created
    async fn upsert_route(&self, domain: &str) -> Result<(String, bool), CloudflareError> {
        let pattern = route_pattern(domain);
        let worker = self.api.worker_name();
        let step = |e: CloudflareError| CloudflareError::Route(e.to_string());

        let routes = self.api.list_routes().await.map_err(step)?;
        match routes.into_iter().find(|r| r.pattern == pattern) {
            Some(existing) => {
                let route = self
                    .api
                    .update_route(&existing.id, &pattern, worker)
                    .await
                    .map_err(step)?;
                let id = if route.id.is_empty() { existing.id } else { route.id };
                Ok((id, false))
            }
            None => {
                let route = self.api.create_route(&pattern, worker).await.map_err(step)?;
                Ok((route.id, true))
            }
        }
    }

    async fn remove_route(&self, domain: &str) -> Result<bool, CloudflareError> {
        let pattern = route_pattern(domain);
        let step = |e: CloudflareError| CloudflareError::Route(e.to_string());

        let routes = self.api.list_routes().await.map_err(step)?;
        match routes.into_iter().find(|r| r.pattern == pattern) {
            Some(route) => {
                self.api.delete_route(&route.id).await.map_err(step)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_dns_records(&self, domain: &str) -> Result<usize, CloudflareError> {
        let step = |e: CloudflareError| CloudflareError::Dns(e.to_string());

        let records = self.api.list_dns_records(domain).await.map_err(step)?;
        let mut removed = 0;
        for record in records.iter().filter(|r| r.name == domain) {
            self.api.delete_dns_record(&record.id).await.map_err(step)?;
            removed += 1;
        }
        Ok(removed)
    }
}
