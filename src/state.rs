use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::cloudflare::{build_http_client, CloudflareError, DomainLocks};
use crate::config::AppConfig;
use crate::events::EventHub;
use crate::services::{CloudflareConfigService, IncidentService, PageService, PlanService, UserService};

/// Shared handles injected into every request as an `Extension`
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub http: reqwest::Client,
    pub events: EventHub,
    pub locks: DomainLocks,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Result<Self, CloudflareError> {
        let http = build_http_client(Duration::from_secs(config.cloudflare.request_timeout_secs))?;
        Ok(Self {
            pool,
            http,
            events: EventHub::new(),
            locks: DomainLocks::default(),
            config: Arc::new(config),
        })
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.pool.clone())
    }

    pub fn pages(&self) -> PageService {
        PageService::new(self.pool.clone())
    }

    pub fn plans(&self) -> PlanService {
        PlanService::new(self.pool.clone())
    }

    pub fn incidents(&self) -> IncidentService {
        IncidentService::new(self.pool.clone())
    }

    pub fn cloudflare_configs(&self) -> CloudflareConfigService {
        CloudflareConfigService::new(
            self.pool.clone(),
            self.http.clone(),
            self.config.cloudflare.api_base.clone(),
            self.config.cloudflare.default_worker_name.clone(),
        )
    }
}
