use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::user::{Role, SubscriptionStatus, User};
use crate::error::ApiError;
use crate::handlers::publish_plan_state;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub plan: String,
    pub status: Option<SubscriptionStatus>,
}

/// GET /api/admin/users?limit=&offset=
pub async fn list(Query(query): Query<ListQuery>, Extension(state): Extension<AppState>) -> ApiResult<Vec<User>> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    Ok(ApiResponse::success(state.users().list(limit, offset).await?))
}

/// PUT /api/admin/users/:id/role
pub async fn role_put(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<User> {
    if id == admin.user_id && payload.role != Role::Admin {
        return Err(ApiError::bad_request("Admins cannot remove their own admin role"));
    }
    let user = state.users().set_role(id, payload.role).await?;
    tracing::info!("Admin {} set role of {} to {}", admin.user_id, id, payload.role.as_str());
    Ok(ApiResponse::success(user))
}

/// PUT /api/admin/users/:id/plan - Assign a plan directly, bypassing Stripe
pub async fn plan_put(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(payload): Json<PlanRequest>,
) -> ApiResult<User> {
    let plan = state
        .plans()
        .find_by_code(payload.plan.trim())
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("Unknown plan '{}'", payload.plan)))?;

    let status = payload.status.unwrap_or(SubscriptionStatus::Active);
    let user = state.users().set_plan(id, &plan.code, status).await?;
    tracing::info!("Admin {} moved user {} to plan {}", admin.user_id, id, plan.code);
    publish_plan_state(&state, &user).await?;
    Ok(ApiResponse::success(user))
}
