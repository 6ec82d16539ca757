// handlers/protected/incidents.rs - Incident management (pro plan)

use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::incident::{Incident, PostMortem};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::incident_service::{IncidentDetail, NewIncident, NewIncidentUpdate};
use crate::services::IncidentService;
use crate::state::AppState;

async fn authorize(state: &AppState, auth_user: &AuthUser) -> Result<IncidentService, ApiError> {
    let user = state.users().get(auth_user.user_id).await?;
    IncidentService::ensure_access(&user, Utc::now())?;
    Ok(state.incidents())
}

/// GET /api/pages/:id/incidents
pub async fn list_for_page(
    Path(page_id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<Incident>> {
    let incidents = authorize(&state, &auth_user).await?;
    Ok(ApiResponse::success(incidents.list_for_page(auth_user.user_id, page_id).await?))
}

/// POST /api/incidents
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<NewIncident>,
) -> ApiResult<IncidentDetail> {
    let incidents = authorize(&state, &auth_user).await?;
    Ok(ApiResponse::created(incidents.create(auth_user.user_id, input).await?))
}

/// GET /api/incidents/:id - Incident with its update log
pub async fn get(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<IncidentDetail> {
    let incidents = authorize(&state, &auth_user).await?;
    Ok(ApiResponse::success(incidents.get(auth_user.user_id, id).await?))
}

/// DELETE /api/incidents/:id
pub async fn delete(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let incidents = authorize(&state, &auth_user).await?;
    incidents.delete(auth_user.user_id, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// POST /api/incidents/:id/updates
pub async fn add_update(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<NewIncidentUpdate>,
) -> ApiResult<IncidentDetail> {
    let incidents = authorize(&state, &auth_user).await?;
    Ok(ApiResponse::created(incidents.add_update(auth_user.user_id, id, input).await?))
}

/// PUT /api/incidents/:id/post-mortem - Only for resolved incidents; closes the incident
pub async fn post_mortem_put(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(post_mortem): Json<PostMortem>,
) -> ApiResult<Incident> {
    let incidents = authorize(&state, &auth_user).await?;
    Ok(ApiResponse::success(
        incidents.write_post_mortem(auth_user.user_id, id, post_mortem).await?,
    ))
}
