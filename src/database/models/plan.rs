use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const FREE_PLAN: &str = "free";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub pages: i32,
    pub views_per_page: i64,
}

impl PlanLimits {
    /// Limits applied when a user's plan is missing or inactive
    pub fn free() -> Self {
        Self {
            pages: 1,
            views_per_page: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stripe_price_id: String,
    pub features: Vec<String>,
    pub page_limit: i32,
    pub views_per_page_limit: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionPlan {
    pub fn limits(&self) -> PlanLimits {
        PlanLimits {
            pages: self.page_limit,
            views_per_page: self.views_per_page_limit,
        }
    }
}

/// Resolve effective limits, falling back to the free tier
pub fn effective_limits(plan: Option<&SubscriptionPlan>) -> PlanLimits {
    match plan {
        Some(plan) if plan.is_active => plan.limits(),
        _ => PlanLimits::free(),
    }
}

/// Plan definition as written in the catalog seed file and admin API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDefinition {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stripe_price_id: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub limits: PlanLimits,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl PlanDefinition {
    pub fn validate(&self) -> Result<(), String> {
        if self.code.is_empty()
            || !self
                .code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(format!("Invalid plan code '{}'", self.code));
        }
        if self.name.trim().is_empty() {
            return Err("Plan name is required".to_string());
        }
        if self.price.is_sign_negative() {
            return Err("Plan price cannot be negative".to_string());
        }
        if self.limits.pages < 1 || self.limits.views_per_page < 1 {
            return Err("Plan limits must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PlanCatalog {
    pub plans: Vec<PlanDefinition>,
}

impl PlanCatalog {
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}
