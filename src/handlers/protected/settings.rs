// handlers/protected/settings.rs - Per-user Cloudflare credentials
//
// The API token is write-only: it is accepted on PUT and never returned.

use axum::{extract::Extension, Json};
use serde_json::{json, Value};

use crate::cloudflare::ConnectivityReport;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::CloudflareConfigInput;
use crate::state::AppState;

/// GET /api/settings/cloudflare
pub async fn cloudflare_get(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let config = state.cloudflare_configs().get(auth_user.user_id).await?;
    Ok(ApiResponse::success(json!({
        "configured": config.is_some(),
        "config": config
    })))
}

/// PUT /api/settings/cloudflare - Save and run the connectivity test.
/// A failing test removes the settings again and returns the report.
pub async fn cloudflare_put(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<CloudflareConfigInput>,
) -> ApiResult<Value> {
    let (config, report) = state
        .cloudflare_configs()
        .save_and_test(auth_user.user_id, input)
        .await?;
    Ok(ApiResponse::success(json!({ "config": config, "report": report }))
        .with_message("Cloudflare settings saved and verified"))
}

/// DELETE /api/settings/cloudflare
pub async fn cloudflare_delete(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let deleted = state.cloudflare_configs().delete(auth_user.user_id).await?;
    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}

/// POST /api/settings/cloudflare/test
pub async fn cloudflare_test(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<ConnectivityReport> {
    let report = state.cloudflare_configs().test(auth_user.user_id).await?;
    Ok(ApiResponse::success(report))
}
