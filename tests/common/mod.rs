//! Shared fixtures: a fake Cloudflare v4 API served by axum on an ephemeral
//! port, and page builders.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use statussaas::cloudflare::{CloudflareClient, CloudflareCredentials};
use statussaas::database::models::page::{Design, MaintenancePage, PageStatus};

pub const TOKEN: &str = "cf-test-token";
pub const ACCOUNT: &str = "acct-1";
pub const ZONE: &str = "zone-1";
pub const NAMESPACE: &str = "ns-1";
pub const WORKER: &str = "maintenance-worker";

#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub pattern: String,
    pub script: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Cname {
    pub id: String,
    pub name: String,
}

#[derive(Default)]
pub struct Account {
    pub kv: HashMap<String, String>,
    pub scripts: HashMap<String, String>,
    pub bindings: HashMap<String, Value>,
    pub routes: Vec<Route>,
    pub dns: Vec<Cname>,
    pub fail_routes: bool,
    pub token_status: Option<String>,
    next_id: u64,
}

impl Account {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

type Shared = Arc<Mutex<Account>>;

pub struct FakeCloudflareServer {
    pub base_url: String,
    account: Shared,
}

impl FakeCloudflareServer {
    pub async fn start() -> Self {
        let account: Shared = Arc::new(Mutex::new(Account::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake cloudflare");
        let addr = listener.local_addr().expect("local addr");

        let app = router(account.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake cloudflare server");
        });

        Self {
            base_url: format!("http://{}", addr),
            account,
        }
    }

    pub fn credentials(&self) -> CloudflareCredentials {
        CloudflareCredentials {
            api_token: TOKEN.to_string(),
            account_id: ACCOUNT.to_string(),
            zone_id: ZONE.to_string(),
            kv_namespace_id: NAMESPACE.to_string(),
            worker_name: WORKER.to_string(),
        }
    }

    pub fn client(&self) -> CloudflareClient {
        self.client_with(self.credentials())
    }

    pub fn client_with(&self, credentials: CloudflareCredentials) -> CloudflareClient {
        CloudflareClient::new(reqwest::Client::new(), self.base_url.clone(), credentials)
    }

    pub fn account(&self) -> MutexGuard<'_, Account> {
        self.account.lock().expect("fake cloudflare state")
    }

    pub fn kv(&self, key: &str) -> Option<String> {
        self.account().kv.get(key).cloned()
    }

    pub fn kv_json(&self, key: &str) -> Option<Value> {
        self.kv(key).map(|raw| serde_json::from_str(&raw).expect("stored KV value is JSON"))
    }

    pub fn script(&self, name: &str) -> Option<String> {
        self.account().scripts.get(name).cloned()
    }

    /// Scripts bound to routes with this exact pattern
    pub fn routes_for(&self, pattern: &str) -> Vec<Option<String>> {
        self.account()
            .routes
            .iter()
            .filter(|r| r.pattern == pattern)
            .map(|r| r.script.clone())
            .collect()
    }

    pub fn add_cname(&self, name: &str) {
        let mut account = self.account();
        let id = account.next_id("dns");
        account.dns.push(Cname {
            id,
            name: name.to_string(),
        });
    }

    pub fn cname_names(&self) -> Vec<String> {
        self.account().dns.iter().map(|r| r.name.clone()).collect()
    }

    pub fn fail_routes(&self, fail: bool) {
        self.account().fail_routes = fail;
    }
}

pub fn page(domain: &str, status: PageStatus) -> MaintenancePage {
    let now = Utc::now();
    MaintenancePage {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        domain: domain.to_string(),
        title: "Scheduled Maintenance".to_string(),
        description: "Database upgrade in progress".to_string(),
        content: "<p>We will be back shortly.</p>".to_string(),
        status,
        deployed: false,
        scheduled_for: None,
        design: SqlJson(Design::default()),
        total_views: 0,
        unique_views: 0,
        slug: Some("scheduled-maintenance".to_string()),
        created_at: now,
        updated_at: now,
    }
}

fn ok(result: Value) -> Response {
    Json(json!({ "success": true, "errors": [], "messages": [], "result": result })).into_response()
}

fn fail(status: StatusCode, code: u32, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "errors": [{ "code": code, "message": message }],
            "messages": [],
            "result": null
        })),
    )
        .into_response()
}

fn not_found(what: &str) -> Response {
    fail(StatusCode::NOT_FOUND, 10007, &format!("{} not found", what))
}

fn router(account: Shared) -> Router {
    Router::new()
        .route("/user/tokens/verify", get(verify_token))
        .route("/accounts/:account", get(get_account))
        .route("/zones/:zone", get(get_zone))
        .route("/accounts/:account/storage/kv/namespaces/:ns", get(get_namespace))
        .route(
            "/accounts/:account/storage/kv/namespaces/:ns/values/:key",
            get(kv_get).put(kv_put).delete(kv_delete),
        )
        .route(
            "/accounts/:account/workers/scripts/:name",
            get(script_get).put(script_put).delete(script_delete),
        )
        .route("/accounts/:account/workers/scripts/:name/bindings", put(bindings_put))
        .route("/zones/:zone/workers/routes", get(routes_list).post(route_create))
        .route("/zones/:zone/workers/routes/:id", put(route_update).delete(route_delete))
        .route("/zones/:zone/dns_records", get(dns_list))
        .route("/zones/:zone/dns_records/:id", axum::routing::delete(dns_delete))
        .layer(middleware::from_fn(require_token))
        .with_state(account)
}

async fn require_token(request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", TOKEN);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == expected);
    if !authorized {
        return fail(StatusCode::FORBIDDEN, 10000, "Authentication error");
    }
    next.run(request).await
}

async fn verify_token(State(account): State<Shared>) -> Response {
    let status = account
        .lock()
        .expect("state")
        .token_status
        .clone()
        .unwrap_or_else(|| "active".to_string());
    ok(json!({ "id": "token-1", "status": status }))
}

async fn get_account(Path(id): Path<String>) -> Response {
    if id != ACCOUNT {
        return not_found("account");
    }
    ok(json!({ "id": id, "name": "Test account" }))
}

async fn get_zone(Path(id): Path<String>) -> Response {
    if id != ZONE {
        return not_found("zone");
    }
    ok(json!({ "id": id, "name": "example.com" }))
}

async fn get_namespace(Path((account_id, ns)): Path<(String, String)>) -> Response {
    if account_id != ACCOUNT || ns != NAMESPACE {
        return not_found("namespace");
    }
    ok(json!({ "id": ns, "title": "MAINTENANCE_PAGES" }))
}

async fn kv_get(State(account): State<Shared>, Path((_, _, key)): Path<(String, String, String)>) -> Response {
    match account.lock().expect("state").kv.get(&key) {
        Some(value) => value.clone().into_response(),
        None => not_found("key"),
    }
}

async fn kv_put(
    State(account): State<Shared>,
    Path((_, _, key)): Path<(String, String, String)>,
    body: String,
) -> Response {
    account.lock().expect("state").kv.insert(key, body);
    ok(Value::Null)
}

async fn kv_delete(State(account): State<Shared>, Path((_, _, key)): Path<(String, String, String)>) -> Response {
    match account.lock().expect("state").kv.remove(&key) {
        Some(_) => ok(Value::Null),
        None => not_found("key"),
    }
}

async fn script_get(State(account): State<Shared>, Path((_, name)): Path<(String, String)>) -> Response {
    match account.lock().expect("state").scripts.get(&name) {
        Some(script) => script.clone().into_response(),
        None => not_found("script"),
    }
}

async fn script_put(State(account): State<Shared>, Path((_, name)): Path<(String, String)>, body: String) -> Response {
    account.lock().expect("state").scripts.insert(name.clone(), body);
    ok(json!({ "id": name }))
}

async fn script_delete(State(account): State<Shared>, Path((_, name)): Path<(String, String)>) -> Response {
    let mut account = account.lock().expect("state");
    account.bindings.remove(&name);
    match account.scripts.remove(&name) {
        Some(_) => ok(json!({ "id": name })),
        None => not_found("script"),
    }
}

async fn bindings_put(
    State(account): State<Shared>,
    Path((_, name)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut account = account.lock().expect("state");
    if !account.scripts.contains_key(&name) {
        return not_found("script");
    }
    account.bindings.insert(name, body);
    ok(Value::Null)
}

#[derive(Deserialize)]
struct RouteBody {
    pattern: String,
    script: Option<String>,
}

async fn routes_list(State(account): State<Shared>) -> Response {
    let routes: Vec<Value> = account
        .lock()
        .expect("state")
        .routes
        .iter()
        .map(|r| json!({ "id": r.id, "pattern": r.pattern, "script": r.script }))
        .collect();
    ok(Value::Array(routes))
}

async fn route_create(State(account): State<Shared>, Json(body): Json<RouteBody>) -> Response {
    let mut account = account.lock().expect("state");
    if account.fail_routes {
        return fail(StatusCode::BAD_REQUEST, 10020, "Route pattern is not allowed");
    }
    if account.routes.iter().any(|r| r.pattern == body.pattern) {
        return fail(StatusCode::CONFLICT, 10020, "Duplicate route pattern");
    }
    let id = account.next_id("route");
    account.routes.push(Route {
        id: id.clone(),
        pattern: body.pattern,
        script: body.script,
    });
    ok(json!({ "id": id }))
}

async fn route_update(
    State(account): State<Shared>,
    Path((_, id)): Path<(String, String)>,
    Json(body): Json<RouteBody>,
) -> Response {
    let mut account = account.lock().expect("state");
    if account.fail_routes {
        return fail(StatusCode::BAD_REQUEST, 10020, "Route pattern is not allowed");
    }
    match account.routes.iter_mut().find(|r| r.id == id) {
        Some(route) => {
            route.pattern = body.pattern;
            route.script = body.script;
            ok(json!({ "id": id }))
        }
        None => not_found("route"),
    }
}

async fn route_delete(State(account): State<Shared>, Path((_, id)): Path<(String, String)>) -> Response {
    let mut account = account.lock().expect("state");
    if account.fail_routes {
        return fail(StatusCode::BAD_REQUEST, 10020, "Route cannot be deleted");
    }
    let before = account.routes.len();
    account.routes.retain(|r| r.id != id);
    if account.routes.len() == before {
        return not_found("route");
    }
    ok(json!({ "id": id }))
}

#[derive(Deserialize)]
struct DnsQuery {
    name: Option<String>,
}

async fn dns_list(State(account): State<Shared>, Query(query): Query<DnsQuery>) -> Response {
    let records: Vec<Value> = account
        .lock()
        .expect("state")
        .dns
        .iter()
        .filter(|r| query.name.as_deref().map_or(true, |n| n == r.name))
        .map(|r| json!({ "id": r.id, "type": "CNAME", "name": r.name, "content": "edge.example.net" }))
        .collect();
    ok(Value::Array(records))
}

async fn dns_delete(State(account): State<Shared>, Path((_, id)): Path<(String, String)>) -> Response {
    let mut account = account.lock().expect("state");
    let before = account.dns.len();
    account.dns.retain(|r| r.id != id);
    if account.dns.len() == before {
        return not_found("dns record");
    }
    ok(json!({ "id": id }))
}
