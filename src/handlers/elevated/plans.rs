use axum::{
    extract::{Extension, Path},
    Json,
};

use crate::database::models::plan::{PlanDefinition, SubscriptionPlan};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/admin/plans - Every plan, including inactive ones
pub async fn list(Extension(state): Extension<AppState>) -> ApiResult<Vec<SubscriptionPlan>> {
    Ok(ApiResponse::success(state.plans().list(true).await?))
}

/// POST /api/admin/plans
pub async fn create(
    Extension(state): Extension<AppState>,
    Json(def): Json<PlanDefinition>,
) -> ApiResult<SubscriptionPlan> {
    let plan = state.plans().create(&def).await?;
    tracing::info!("Created plan {}", plan.code);
    Ok(ApiResponse::created(plan))
}

/// PUT /api/admin/plans/:code - The code is immutable; the path wins over the body
pub async fn update(
    Path(code): Path<String>,
    Extension(state): Extension<AppState>,
    Json(def): Json<PlanDefinition>,
) -> ApiResult<SubscriptionPlan> {
    Ok(ApiResponse::success(state.plans().update(&code, &def).await?))
}

/// DELETE /api/admin/plans/:code - Deactivates; users keep the code and fall back to free limits
pub async fn delete(Path(code): Path<String>, Extension(state): Extension<AppState>) -> ApiResult<SubscriptionPlan> {
    let plan = state.plans().deactivate(&code).await?;
    tracing::info!("Deactivated plan {}", code);
    Ok(ApiResponse::success(plan))
}
