use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{self, AuthError};
use crate::database::manager::DatabaseError;
use crate::database::models::plan::FREE_PLAN;
use crate::database::models::user::{normalize_email, Role, SubscriptionStatus, User, UserStatus};

const USER_COLUMNS: &str = "id, email, name, password_hash, oauth_provider, oauth_subject, role, status,
     subscription_plan, subscription_status, stripe_customer_id, stripe_subscription_id,
     current_period_end, last_login_at, created_at, updated_at";

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a password account on the free plan
    pub async fn register(&self, email: &str, name: &str, password: &str, role: Role) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidCredentials);
        }
        let hash = auth::hash_password(password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash, role, subscription_plan, subscription_status)
             VALUES ($1, $2, $3, $4, $5, 'active')
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&email)
        .bind(name.trim())
        .bind(&hash)
        .bind(role)
        .bind(FREE_PLAN)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from_unique(e, "email") {
            DatabaseError::Conflict(_) => AuthError::EmailTaken,
            other => AuthError::Database(other),
        })?;

        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Check credentials and stamp the login time
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = user.password_hash.as_deref().ok_or(AuthError::InvalidCredentials)?;
        if !auth::verify_password(password, hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if user.status != UserStatus::Active {
            return Err(AuthError::AccountDisabled);
        }

        sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(user.id)
            .execute(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DatabaseError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_stripe_customer(&self, customer_id: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE stripe_customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_stripe_subscription(&self, subscription_id: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE stripe_subscription_id = $1"
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn set_role(&self, id: Uuid, role: Role) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }

    /// Move a user onto `plan_code` with the given status
    pub async fn set_plan(
        &self,
        id: Uuid,
        plan_code: &str,
        status: SubscriptionStatus,
    ) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET subscription_plan = $2, subscription_status = $3, updated_at = now()
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(plan_code)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }

    /// Record the state of a Stripe subscription on the user
    pub async fn apply_stripe_subscription(
        &self,
        id: Uuid,
        plan_code: &str,
        status: SubscriptionStatus,
        subscription_id: &str,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET subscription_plan = $2, subscription_status = $3,
                 stripe_subscription_id = $4, current_period_end = $5, updated_at = now()
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(plan_code)
        .bind(status)
        .bind(subscription_id)
        .bind(period_end)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }

    /// Drop back to the free plan after Stripe cancels a subscription
    pub async fn cancel_stripe_subscription(&self, id: Uuid) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET subscription_plan = $2, subscription_status = 'canceled',
                 stripe_subscription_id = NULL, current_period_end = NULL, updated_at = now()
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(FREE_PLAN)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }
}
