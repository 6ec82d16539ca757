//! Test utilities: an in-memory Cloudflare account and page fixtures.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::types::Json;
use uuid::Uuid;

use crate::cloudflare::error::CloudflareError;
use crate::cloudflare::types::{DnsRecord, TokenStatus, WorkerRoute};
use crate::cloudflare::CloudflareApi;
use crate::database::models::page::{slugify, Design, MaintenancePage, PageStatus};

/// API calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    VerifyToken,
    GetAccount,
    GetZone,
    GetKvNamespace,
    KvGet,
    KvPut,
    KvDelete,
    UploadScript,
    DeleteScript,
    BindKv,
    ListRoutes,
    CreateRoute,
    UpdateRoute,
    DeleteRoute,
    ListDns,
    DeleteDns,
}

#[derive(Default)]
struct State {
    kv: HashMap<String, String>,
    scripts: HashMap<String, String>,
    bound: HashSet<String>,
    routes: Vec<WorkerRoute>,
    dns: Vec<DnsRecord>,
    failing: HashSet<Operation>,
    token_status: Option<String>,
    next_id: u32,
}

/// In-memory stand-in for one Cloudflare account/zone/namespace
pub struct FakeCloudflare {
    worker_name: String,
    state: Mutex<State>,
}

impl FakeCloudflare {
    pub fn new() -> Self {
        Self {
            worker_name: "maintenance-worker".to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn fail_on(&self, op: Operation) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn set_token_status(&self, status: &str) {
        self.state.lock().unwrap().token_status = Some(status.to_string());
    }

    pub fn kv_value(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().kv.get(key).cloned()
    }

    pub fn script(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().scripts.get(name).cloned()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.state.lock().unwrap().bound.contains(name)
    }

    /// Scripts of every route with this pattern
    pub fn routes_for(&self, pattern: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .routes
            .iter()
            .filter(|r| r.pattern == pattern)
            .filter_map(|r| r.script.clone())
            .collect()
    }

    pub fn add_cname(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("dns-{}", state.next_id);
        state.dns.push(DnsRecord {
            id,
            record_type: "CNAME".into(),
            name: name.into(),
            content: "origin.example.net".into(),
        });
    }

    pub fn cname_names(&self) -> Vec<String> {
        self.state.lock().unwrap().dns.iter().map(|r| r.name.clone()).collect()
    }

    fn check(&self, op: Operation) -> Result<(), CloudflareError> {
        if self.state.lock().unwrap().failing.contains(&op) {
            return Err(CloudflareError::Api {
                status: 500,
                message: format!("injected failure: {:?}", op),
            });
        }
        Ok(())
    }
}

impl Default for FakeCloudflare {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudflareApi for FakeCloudflare {
    fn worker_name(&self) -> &str {
        &self.worker_name
    }

    async fn verify_token(&self) -> Result<TokenStatus, CloudflareError> {
        self.check(Operation::VerifyToken)?;
        let status = self
            .state
            .lock()
            .unwrap()
            .token_status
            .clone()
            .unwrap_or_else(|| "active".to_string());
        Ok(TokenStatus {
            id: "token-1".into(),
            status,
        })
    }

    async fn get_account(&self) -> Result<Value, CloudflareError> {
        self.check(Operation::GetAccount)?;
        Ok(json!({ "id": "account-1" }))
    }

    async fn get_zone(&self) -> Result<Value, CloudflareError> {
        self.check(Operation::GetZone)?;
        Ok(json!({ "id": "zone-1" }))
    }

    async fn get_kv_namespace(&self) -> Result<Value, CloudflareError> {
        self.check(Operation::GetKvNamespace)?;
        Ok(json!({ "id": "ns-1" }))
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>, CloudflareError> {
        self.check(Operation::KvGet)?;
        Ok(self.kv_value(key))
    }

    async fn kv_put(&self, key: &str, value: &str) -> Result<(), CloudflareError> {
        self.check(Operation::KvPut)?;
        self.state.lock().unwrap().kv.insert(key.into(), value.into());
        Ok(())
    }

    async fn kv_delete(&self, key: &str) -> Result<bool, CloudflareError> {
        self.check(Operation::KvDelete)?;
        Ok(self.state.lock().unwrap().kv.remove(key).is_some())
    }

    async fn script_exists(&self, name: &str) -> Result<bool, CloudflareError> {
        Ok(self.script(name).is_some())
    }

    async fn upload_script(&self, name: &str, script: &str) -> Result<(), CloudflareError> {
        self.check(Operation::UploadScript)?;
        self.state.lock().unwrap().scripts.insert(name.into(), script.into());
        Ok(())
    }

    async fn delete_script(&self, name: &str) -> Result<bool, CloudflareError> {
        self.check(Operation::DeleteScript)?;
        let mut state = self.state.lock().unwrap();
        state.bound.remove(name);
        Ok(state.scripts.remove(name).is_some())
    }

    async fn bind_kv_namespace(&self, name: &str) -> Result<(), CloudflareError> {
        self.check(Operation::BindKv)?;
        self.state.lock().unwrap().bound.insert(name.into());
        Ok(())
    }

    async fn list_routes(&self) -> Result<Vec<WorkerRoute>, CloudflareError> {
        self.check(Operation::ListRoutes)?;
        Ok(self.state.lock().unwrap().routes.clone())
    }

    async fn create_route(&self, pattern: &str, script: &str) -> Result<WorkerRoute, CloudflareError> {
        self.check(Operation::CreateRoute)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let route = WorkerRoute {
            id: format!("route-{}", state.next_id),
            pattern: pattern.into(),
            script: Some(script.into()),
        };
        state.routes.push(route.clone());
        Ok(route)
    }

    async fn update_route(&self, id: &str, pattern: &str, script: &str) -> Result<WorkerRoute, CloudflareError> {
        self.check(Operation::UpdateRoute)?;
        let mut state = self.state.lock().unwrap();
        let route = state
            .routes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CloudflareError::Api {
                status: 404,
                message: "route not found".into(),
            })?;
        route.pattern = pattern.into();
        route.script = Some(script.into());
        Ok(route.clone())
    }

    async fn delete_route(&self, id: &str) -> Result<(), CloudflareError> {
        self.check(Operation::DeleteRoute)?;
        self.state.lock().unwrap().routes.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_dns_records(&self, name: &str) -> Result<Vec<DnsRecord>, CloudflareError> {
        self.check(Operation::ListDns)?;
        let state = self.state.lock().unwrap();
        Ok(state.dns.iter().filter(|r| r.name == name).cloned().collect())
    }

    async fn delete_dns_record(&self, id: &str) -> Result<(), CloudflareError> {
        self.check(Operation::DeleteDns)?;
        self.state.lock().unwrap().dns.retain(|r| r.id != id);
        Ok(())
    }
}

/// A page row as it would come back from the database
pub fn sample_page(domain: &str, status: PageStatus) -> MaintenancePage {
    let now = Utc::now();
    let title = "Scheduled Maintenance".to_string();
    MaintenancePage {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        domain: domain.to_string(),
        slug: Some(slugify(&title)),
        title,
        description: "We are upgrading our database".to_string(),
        content: "<p>Back online by 18:00 UTC.</p>".to_string(),
        status,
        deployed: false,
        scheduled_for: None,
        design: Json(Design::default()),
        total_views: 0,
        unique_views: 0,
        created_at: now,
        updated_at: now,
    }
}
