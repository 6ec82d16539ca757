use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::cloudflare::{
    run_connectivity_test, CloudflareApi, CloudflareClient, CloudflareCredentials, CloudflareError,
    ConnectivityReport,
};
use crate::database::manager::DatabaseError;
use crate::database::models::cloudflare_config::{CloudflareConfig, CloudflareSecretRow};

const CONFIG_COLUMNS: &str = "id, user_id, email, account_id, zone_id, kv_namespace_id, worker_name,
     is_active, last_used, created_at, updated_at";

#[derive(Debug, Error)]
pub enum CloudflareConfigError {
    #[error("{0}")]
    Validation(String),

    #[error("Cloudflare connectivity test failed: {message}")]
    TestFailed {
        message: String,
        report: ConnectivityReport,
    },

    #[error(transparent)]
    Cloudflare(#[from] CloudflareError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for CloudflareConfigError {
    fn from(err: sqlx::Error) -> Self {
        CloudflareConfigError::Database(DatabaseError::Sqlx(err))
    }
}

/// Settings form; `api_token` may be omitted to keep the stored one
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfigInput {
    pub api_token: Option<String>,
    pub email: String,
    pub account_id: String,
    pub zone_id: String,
    pub kv_namespace_id: String,
    pub worker_name: Option<String>,
}

/// Builds per-request Cloudflare clients from stored credentials
#[derive(Clone)]
pub struct CloudflareConfigService {
    pool: PgPool,
    http: reqwest::Client,
    api_base: String,
    default_worker_name: String,
}

impl CloudflareConfigService {
    pub fn new(pool: PgPool, http: reqwest::Client, api_base: impl Into<String>, default_worker_name: impl Into<String>) -> Self {
        Self {
            pool,
            http,
            api_base: api_base.into(),
            default_worker_name: default_worker_name.into(),
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<CloudflareConfig>, CloudflareConfigError> {
        let config = sqlx::query_as::<_, CloudflareConfig>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM cloudflare_configs WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(config)
    }

    /// Load credentials, verify the token, and return a client for this request
    pub async fn client_for_user(&self, user_id: Uuid) -> Result<CloudflareClient, CloudflareConfigError> {
        let row = sqlx::query_as::<_, CloudflareSecretRow>(
            "SELECT api_token, account_id, zone_id, kv_namespace_id, worker_name
             FROM cloudflare_configs WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CloudflareError::configuration("Cloudflare is not configured for this account"))?;

        let api_token = row
            .api_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CloudflareError::configuration("Cloudflare API token is missing"))?;

        let client = self.client(CloudflareCredentials {
            api_token,
            account_id: row.account_id,
            zone_id: row.zone_id,
            kv_namespace_id: row.kv_namespace_id,
            worker_name: row.worker_name,
        });

        let token = client
            .verify_token()
            .await
            .map_err(|e| CloudflareError::configuration(format!("API token verification failed: {}", e)))?;
        if !token.is_active() {
            return Err(CloudflareError::configuration(format!("API token status is '{}'", token.status)).into());
        }

        sqlx::query("UPDATE cloudflare_configs SET last_used = now() WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(client)
    }

    /// Save settings, then run the connectivity test. A failed test removes the config.
    pub async fn save_and_test(
        &self,
        user_id: Uuid,
        input: CloudflareConfigInput,
    ) -> Result<(CloudflareConfig, ConnectivityReport), CloudflareConfigError> {
        let fields = [
            ("email", &input.email),
            ("account_id", &input.account_id),
            ("zone_id", &input.zone_id),
            ("kv_namespace_id", &input.kv_namespace_id),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(CloudflareConfigError::Validation(format!("{} is required", name)));
        }
        let token = input.api_token.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let worker_name = input
            .worker_name
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .unwrap_or(&self.default_worker_name)
            .to_string();

        let existing_token: Option<String> =
            sqlx::query_scalar("SELECT api_token FROM cloudflare_configs WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        let api_token = match (token, existing_token) {
            (Some(t), _) => t.to_string(),
            (None, Some(t)) => t,
            (None, None) => return Err(CloudflareConfigError::Validation("api_token is required".into())),
        };

        let config = sqlx::query_as::<_, CloudflareConfig>(&format!(
            "INSERT INTO cloudflare_configs
                 (user_id, api_token, email, account_id, zone_id, kv_namespace_id, worker_name, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
             ON CONFLICT (user_id) DO UPDATE SET
                 api_token = EXCLUDED.api_token,
                 email = EXCLUDED.email,
                 account_id = EXCLUDED.account_id,
                 zone_id = EXCLUDED.zone_id,
                 kv_namespace_id = EXCLUDED.kv_namespace_id,
                 worker_name = EXCLUDED.worker_name,
                 is_active = TRUE,
                 updated_at = now()
             RETURNING {CONFIG_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&api_token)
        .bind(input.email.trim())
        .bind(input.account_id.trim())
        .bind(input.zone_id.trim())
        .bind(input.kv_namespace_id.trim())
        .bind(&worker_name)
        .fetch_one(&self.pool)
        .await?;

        let client = self.client(CloudflareCredentials {
            api_token,
            account_id: config.account_id.clone(),
            zone_id: config.zone_id.clone(),
            kv_namespace_id: config.kv_namespace_id.clone(),
            worker_name,
        });
        let report = run_connectivity_test(&client).await;
        if !report.success {
            self.delete(user_id).await?;
            let message = report.failure().unwrap_or("unknown failure").to_string();
            tracing::warn!("Removed Cloudflare settings for {} after failed test: {}", user_id, message);
            return Err(CloudflareConfigError::TestFailed { message, report });
        }

        tracing::info!("Saved Cloudflare settings for {}", user_id);
        Ok((config, report))
    }

    /// Re-run the connectivity test against the stored settings
    pub async fn test(&self, user_id: Uuid) -> Result<ConnectivityReport, CloudflareConfigError> {
        let client = self.client_for_user(user_id).await?;
        Ok(run_connectivity_test(&client).await)
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<bool, CloudflareConfigError> {
        let result = sqlx::query("DELETE FROM cloudflare_configs WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn client(&self, credentials: CloudflareCredentials) -> CloudflareClient {
        CloudflareClient::new(self.http.clone(), self.api_base.clone(), credentials)
    }
}
