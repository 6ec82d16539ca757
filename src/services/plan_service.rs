use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::plan::{effective_limits, PlanDefinition, PlanLimits, SubscriptionPlan};
use crate::database::models::user::User;

const PLAN_COLUMNS: &str = "id, code, name, description, price, stripe_price_id, features,
     page_limit, views_per_page_limit, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PlanService {
    pool: PgPool,
}

impl PlanService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<SubscriptionPlan>, DatabaseError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM subscription_plans
             WHERE is_active OR $1
             ORDER BY price ASC, code ASC"
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<SubscriptionPlan>, DatabaseError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM subscription_plans WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    pub async fn find_by_price_id(&self, price_id: &str) -> Result<Option<SubscriptionPlan>, DatabaseError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM subscription_plans WHERE stripe_price_id = $1"
        ))
        .bind(price_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    /// Limits for the user's current plan, free tier when the plan is gone
    pub async fn limits_for(&self, user: &User) -> Result<PlanLimits, DatabaseError> {
        let plan = self.find_by_code(&user.subscription_plan).await?;
        Ok(effective_limits(plan.as_ref()))
    }

    /// Insert the plan, or replace everything but its identity if the code exists
    pub async fn upsert(&self, def: &PlanDefinition) -> Result<SubscriptionPlan, DatabaseError> {
        def.validate().map_err(DatabaseError::Invalid)?;
        let plan = sqlx::query_as::<_, SubscriptionPlan>(&format!(
            "INSERT INTO subscription_plans
                 (code, name, description, price, stripe_price_id, features, page_limit, views_per_page_limit, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (code) DO UPDATE SET
                 name = EXCLUDED.name,
                 description = EXCLUDED.description,
                 price = EXCLUDED.price,
                 stripe_price_id = EXCLUDED.stripe_price_id,
                 features = EXCLUDED.features,
                 page_limit = EXCLUDED.page_limit,
                 views_per_page_limit = EXCLUDED.views_per_page_limit,
                 is_active = EXCLUDED.is_active,
                 updated_at = now()
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(&def.code)
        .bind(&def.name)
        .bind(&def.description)
        .bind(def.price)
        .bind(&def.stripe_price_id)
        .bind(&def.features)
        .bind(def.limits.pages)
        .bind(def.limits.views_per_page)
        .bind(def.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_unique(e, format!("Stripe price '{}' is already used", def.stripe_price_id)))?;
        Ok(plan)
    }

    /// Create a new plan; fails when the code is taken
    pub async fn create(&self, def: &PlanDefinition) -> Result<SubscriptionPlan, DatabaseError> {
        if self.find_by_code(&def.code).await?.is_some() {
            return Err(DatabaseError::Conflict(format!("Plan '{}' already exists", def.code)));
        }
        self.upsert(def).await
    }

    /// Update an existing plan; the code in the path wins over the body
    pub async fn update(&self, code: &str, def: &PlanDefinition) -> Result<SubscriptionPlan, DatabaseError> {
        if self.find_by_code(code).await?.is_none() {
            return Err(DatabaseError::NotFound(format!("Plan '{}' not found", code)));
        }
        let def = PlanDefinition {
            code: code.to_string(),
            ..def.clone()
        };
        self.upsert(&def).await
    }

    /// Plans are never deleted; users may still reference the code
    pub async fn deactivate(&self, code: &str) -> Result<SubscriptionPlan, DatabaseError> {
        sqlx::query_as::<_, SubscriptionPlan>(&format!(
            "UPDATE subscription_plans SET is_active = FALSE, updated_at = now()
             WHERE code = $1 RETURNING {PLAN_COLUMNS}"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Plan '{}' not found", code)))
    }
}
