// handlers/protected/billing.rs - Plan catalog and the caller's subscription

use axum::{extract::Extension, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::plan::SubscriptionPlan;
use crate::database::models::user::SubscriptionStatus;
use crate::error::ApiError;
use crate::handlers::publish_plan_state;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan: String,
}

/// GET /api/plans - Active plans, cheapest first
pub async fn plans_get(Extension(state): Extension<AppState>) -> ApiResult<Vec<SubscriptionPlan>> {
    Ok(ApiResponse::success(state.plans().list(false).await?))
}

/// GET /api/subscription
pub async fn subscription_get(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let user = state.users().get(auth_user.user_id).await?;
    let plan = state.plans().find_by_code(&user.subscription_plan).await?;
    let limits = state.plans().limits_for(&user).await?;
    let page_count = state.pages().count_for_user(user.id).await?;

    Ok(ApiResponse::success(json!({
        "plan": plan,
        "plan_code": user.subscription_plan,
        "status": user.subscription_status,
        "current_period_end": user.current_period_end,
        "active": user.has_active_subscription(Utc::now()),
        "limits": limits,
        "page_count": page_count,
        "can_create_page": user.can_create_page(page_count, &limits)
    })))
}

/// PUT /api/subscription/plan
///
/// Free plans apply immediately. A paid plan is recorded as `incomplete`
/// until the Stripe webhook confirms payment.
pub async fn subscription_plan_put(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ChangePlanRequest>,
) -> ApiResult<Value> {
    let plan = state
        .plans()
        .find_by_code(payload.plan.trim())
        .await?
        .filter(|plan| plan.is_active)
        .ok_or_else(|| ApiError::bad_request("Invalid plan selected"))?;

    let status = if plan.price == Decimal::ZERO {
        SubscriptionStatus::Active
    } else {
        SubscriptionStatus::Incomplete
    };
    let user = state.users().set_plan(auth_user.user_id, &plan.code, status).await?;
    tracing::info!("User {} selected plan {} ({:?})", user.id, plan.code, status);
    publish_plan_state(&state, &user).await?;

    Ok(ApiResponse::success(json!({
        "plan": plan,
        "status": user.subscription_status
    })))
}
