use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::error::CloudflareError;
use super::types::{CloudflareCredentials, DnsRecord, Envelope, TokenStatus, WorkerRoute};

/// Name the KV namespace is bound under inside deployed worker scripts
pub const KV_BINDING_NAME: &str = "MAINTENANCE_PAGES";

/// The subset of the Cloudflare v4 API the deployment pipeline relies on.
///
/// Every method is scoped to the account/zone/namespace of the credentials
/// the implementation was built with.
#[async_trait]
pub trait CloudflareApi: Send + Sync {
    fn worker_name(&self) -> &str;

    async fn verify_token(&self) -> Result<TokenStatus, CloudflareError>;
    async fn get_account(&self) -> Result<Value, CloudflareError>;
    async fn get_zone(&self) -> Result<Value, CloudflareError>;
    async fn get_kv_namespace(&self) -> Result<Value, CloudflareError>;

    /// Raw KV value, `None` when the key does not exist
    async fn kv_get(&self, key: &str) -> Result<Option<String>, CloudflareError>;
    async fn kv_put(&self, key: &str, value: &str) -> Result<(), CloudflareError>;
    /// Returns `false` when there was nothing to delete
    async fn kv_delete(&self, key: &str) -> Result<bool, CloudflareError>;

    async fn script_exists(&self, name: &str) -> Result<bool, CloudflareError>;
    async fn upload_script(&self, name: &str, script: &str) -> Result<(), CloudflareError>;
    /// Returns `false` when the script did not exist
    async fn delete_script(&self, name: &str) -> Result<bool, CloudflareError>;
    async fn bind_kv_namespace(&self, name: &str) -> Result<(), CloudflareError>;

    async fn list_routes(&self) -> Result<Vec<WorkerRoute>, CloudflareError>;
    async fn create_route(&self, pattern: &str, script: &str) -> Result<WorkerRoute, CloudflareError>;
    async fn update_route(&self, id: &str, pattern: &str, script: &str) -> Result<WorkerRoute, CloudflareError>;
    async fn delete_route(&self, id: &str) -> Result<(), CloudflareError>;

    async fn list_dns_records(&self, name: &str) -> Result<Vec<DnsRecord>, CloudflareError>;
    async fn delete_dns_record(&self, id: &str) -> Result<(), CloudflareError>;
}

/// Build the shared HTTP client used for all outbound Cloudflare calls
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, CloudflareError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("statussaas/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// `reqwest` implementation of [`CloudflareApi`]
#[derive(Clone, Debug)]
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CloudflareCredentials,
}

impl CloudflareClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, credentials: CloudflareCredentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            credentials,
        }
    }

    pub fn credentials(&self) -> &CloudflareCredentials {
        &self.credentials
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Cloudflare {} {}", method, path);
        self.http
            .request(method, url)
            .bearer_auth(&self.credentials.api_token)
    }

    fn account_path(&self, rest: &str) -> String {
        format!("/accounts/{}{}", self.credentials.account_id, rest)
    }

    fn zone_path(&self, rest: &str) -> String {
        format!("/zones/{}{}", self.credentials.zone_id, rest)
    }

    fn kv_value_path(&self, key: &str) -> String {
        self.account_path(&format!(
            "/storage/kv/namespaces/{}/values/{}",
            self.credentials.kv_namespace_id,
            encode_segment(key)
        ))
    }

    fn script_path(&self, name: &str) -> String {
        self.account_path(&format!("/workers/scripts/{}", encode_segment(name)))
    }

    /// Send a request and unwrap the v4 envelope, returning `result`
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, CloudflareError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_envelope(status, &body)
    }

    async fn send_required<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CloudflareError> {
        self.send(request).await?.ok_or_else(|| CloudflareError::Api {
            status: 200,
            message: "response did not include a result".to_string(),
        })
    }
}

/// Decode a v4 envelope, turning `success: false` or non-2xx into [`CloudflareError::Api`]
fn parse_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Option<T>, CloudflareError> {
    match serde_json::from_str::<Envelope<T>>(body) {
        Ok(envelope) if envelope.success && status.is_success() => Ok(envelope.result),
        Ok(envelope) => {
            let message = if envelope.errors.is_empty() {
                format!("request failed with status {}", status)
            } else {
                envelope
                    .errors
                    .iter()
                    .map(|e| format!("{} ({})", e.message, e.code))
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            Err(CloudflareError::Api {
                status: status.as_u16(),
                message,
            })
        }
        Err(_) if !status.is_success() => Err(CloudflareError::Api {
            status: status.as_u16(),
            message: truncate(body, 200),
        }),
        Err(e) => Err(CloudflareError::Serialization(e)),
    }
}

/// Percent-encode one path segment (`/`, `?`, `#` and spaces included)
fn encode_segment(segment: &str) -> String {
    let Ok(mut url) = Url::parse("http://segment.invalid/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(segment);
    }
    url.path().trim_start_matches('/').to_string()
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait]
impl CloudflareApi for CloudflareClient {
    fn worker_name(&self) -> &str {
        &self.credentials.worker_name
    }

    async fn verify_token(&self) -> Result<TokenStatus, CloudflareError> {
        self.send_required(self.request(Method::GET, "/user/tokens/verify"))
            .await
    }

    async fn get_account(&self) -> Result<Value, CloudflareError> {
        self.send_required(self.request(Method::GET, &self.account_path("")))
            .await
    }

    async fn get_zone(&self) -> Result<Value, CloudflareError> {
        self.send_required(self.request(Method::GET, &self.zone_path("")))
            .await
    }

    async fn get_kv_namespace(&self) -> Result<Value, CloudflareError> {
        let path = self.account_path(&format!(
            "/storage/kv/namespaces/{}",
            self.credentials.kv_namespace_id
        ));
        self.send_required(self.request(Method::GET, &path)).await
    }

    async fn kv_get(&self, key: &str) -> Result<Option<String>, CloudflareError> {
        // Value reads return the raw stored bytes, not an envelope
        let response = self
            .request(Method::GET, &self.kv_value_path(key))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        if status.is_success() {
            return Ok(Some(body));
        }
        parse_envelope::<Value>(status, &body).map(|_| None)
    }

    async fn kv_put(&self, key: &str, value: &str) -> Result<(), CloudflareError> {
        let request = self
            .request(Method::PUT, &self.kv_value_path(key))
            .header(header::CONTENT_TYPE, "text/plain")
            .body(value.to_string());
        self.send::<Value>(request).await.map(|_| ())
    }

    async fn kv_delete(&self, key: &str) -> Result<bool, CloudflareError> {
        match self
            .send::<Value>(self.request(Method::DELETE, &self.kv_value_path(key)))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn script_exists(&self, name: &str) -> Result<bool, CloudflareError> {
        let response = self
            .request(Method::GET, &self.script_path(name))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if status.is_success() {
            return Ok(true);
        }
        let body = response.text().await?;
        parse_envelope::<Value>(status, &body).map(|_| false)
    }

    async fn upload_script(&self, name: &str, script: &str) -> Result<(), CloudflareError> {
        let request = self
            .request(Method::PUT, &self.script_path(name))
            .header(header::CONTENT_TYPE, "application/javascript")
            .body(script.to_string());
        self.send::<Value>(request).await.map(|_| ())
    }

    async fn delete_script(&self, name: &str) -> Result<bool, CloudflareError> {
        match self
            .send::<Value>(self.request(Method::DELETE, &self.script_path(name)))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn bind_kv_namespace(&self, name: &str) -> Result<(), CloudflareError> {
        let body = json!({
            "bindings": [{
                "type": "kv_namespace",
                "name": KV_BINDING_NAME,
                "namespace_id": self.credentials.kv_namespace_id,
            }]
        });
        let path = format!("{}/bindings", self.script_path(name));
        self.send::<Value>(self.request(Method::PUT, &path).json(&body))
            .await
            .map(|_| ())
    }

    async fn list_routes(&self) -> Result<Vec<WorkerRoute>, CloudflareError> {
        let routes = self
            .send::<Vec<WorkerRoute>>(self.request(Method::GET, &self.zone_path("/workers/routes")))
            .await?;
        Ok(routes.unwrap_or_default())
    }

    async fn create_route(&self, pattern: &str, script: &str) -> Result<WorkerRoute, CloudflareError> {
        let body = json!({ "pattern": pattern, "script": script });
        let route: Value = self
            .send_required(
                self.request(Method::POST, &self.zone_path("/workers/routes"))
                    .json(&body),
            )
            .await?;
        Ok(route_from_result(route, pattern, script))
    }

    async fn update_route(&self, id: &str, pattern: &str, script: &str) -> Result<WorkerRoute, CloudflareError> {
        let body = json!({ "pattern": pattern, "script": script });
        let path = self.zone_path(&format!("/workers/routes/{}", encode_segment(id)));
        let route: Value = self
            .send_required(self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(route_from_result(route, pattern, script))
    }

    async fn delete_route(&self, id: &str) -> Result<(), CloudflareError> {
        let path = self.zone_path(&format!("/workers/routes/{}", encode_segment(id)));
        self.send::<Value>(self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
    }

    async fn list_dns_records(&self, name: &str) -> Result<Vec<DnsRecord>, CloudflareError> {
        let request = self
            .request(Method::GET, &self.zone_path("/dns_records"))
            .query(&[("type", "CNAME"), ("name", name)]);
        let records = self.send::<Vec<DnsRecord>>(request).await?;
        Ok(records.unwrap_or_default())
    }

    async fn delete_dns_record(&self, id: &str) -> Result<(), CloudflareError> {
        let path = self.zone_path(&format!("/dns_records/{}", encode_segment(id)));
        self.send::<Value>(self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
    }
}

/// Route create/update results only echo `id` in some API versions
fn route_from_result(result: Value, pattern: &str, script: &str) -> WorkerRoute {
    let id = result
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    WorkerRoute {
        id,
        pattern: pattern.to_string(),
        script: Some(script.to_string()),
    }
}
