// handlers/protected/session.rs - GET /api/auth/whoami

use axum::extract::Extension;
use chrono::Utc;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// Current user with plan limits and page usage
pub async fn whoami_get(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let user = state.users().get(auth_user.user_id).await?;
    let limits = state.plans().limits_for(&user).await?;
    let page_count = state.pages().count_for_user(user.id).await?;

    Ok(ApiResponse::success(json!({
        "user": user,
        "limits": limits,
        "page_count": page_count,
        "can_create_page": user.can_create_page(page_count, &limits),
        "has_active_subscription": user.has_active_subscription(Utc::now())
    })))
}
