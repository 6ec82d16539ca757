use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub cloudflare: CloudflareSettings,
    pub stripe: StripeConfig,
    pub pages: PagesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

/// Process-wide Cloudflare settings. Per-user credentials live in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareSettings {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub default_worker_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,
    pub signature_tolerance_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    pub visitor_cookie_max_age_secs: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::var("STATUSSAAS_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Cloudflare overrides
        if let Ok(v) = env::var("CLOUDFLARE_API_BASE") {
            self.cloudflare.api_base = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("CLOUDFLARE_TIMEOUT_SECS") {
            self.cloudflare.request_timeout_secs = v.parse().unwrap_or(self.cloudflare.request_timeout_secs);
        }
        if let Ok(v) = env::var("CLOUDFLARE_DEFAULT_WORKER_NAME") {
            self.cloudflare.default_worker_name = v;
        }

        // Stripe overrides
        if let Ok(v) = env::var("STRIPE_WEBHOOK_SECRET") {
            self.stripe.webhook_secret = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("STRIPE_SIGNATURE_TOLERANCE_SECS") {
            self.stripe.signature_tolerance_secs = v.parse().unwrap_or(self.stripe.signature_tolerance_secs);
        }

        if let Ok(v) = env::var("PAGES_VISITOR_COOKIE_MAX_AGE_SECS") {
            self.pages.visitor_cookie_max_age_secs = v.parse().unwrap_or(self.pages.visitor_cookie_max_age_secs);
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/statussaas".to_string(),
                max_connections: 10,
                acquire_timeout_secs: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: Vec::new(),
            },
            cloudflare: CloudflareSettings {
                api_base: "https://api.cloudflare.com/client/v4".to_string(),
                request_timeout_secs: 30,
                default_worker_name: "maintenance-worker".to_string(),
            },
            stripe: StripeConfig {
                webhook_secret: None,
                signature_tolerance_secs: 300,
            },
            pages: PagesConfig {
                visitor_cookie_max_age_secs: 24 * 60 * 60,
            },
        }
    }

    pub fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        config.security.jwt_secret = "development-secret-change-me".to_string();
        config.security.jwt_expiry_hours = 24 * 7; // 1 week
        config.security.cors_origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        config
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.acquire_timeout_secs = 5;
        config.security.jwt_expiry_hours = 4;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config.cloudflare.request_timeout_secs = 15;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
