// handlers/protected/pages/deploy.rs - Edge deployment endpoints

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cloudflare::Deployer;
use crate::database::models::page::PageStatus;
use crate::error::ApiError;
use crate::events::EventKind;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivationRequest {
    pub status: PageStatus,
}

/**
 * POST /api/pages/:id/deploy - Push the page to Cloudflare
 *
 * Writes the KV record, replaces the worker script and upserts the route.
 * A failure after the KV write is reported as a 502 naming the failed step;
 * the KV value stays written and re-deploying converges.
 *
 * Expected Output:
 * ```json
 * {
 *   "success": true,
 *   "data": {
 *     "page": { "id": "...", "deployed": true, ... },
 *     "deployment": { "domain": "example.com", "worker_name": "maintenance-worker",
 *                     "route_pattern": "*example.com/ *", "route_id": "...", "route_created": true }
 *   }
 * }
 * ```
 */
pub async fn deploy_post(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let page = state.pages().get_owned(auth_user.user_id, id).await?;
    let client = state.cloudflare_configs().client_for_user(auth_user.user_id).await?;

    publish_deployment(&state, auth_user.user_id, id, &page.domain, "started");
    let report = match Deployer::new(&client, &state.locks).deploy(&page).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Deployment of page {} to {} failed: {}", id, page.domain, e);
            publish_deployment(&state, auth_user.user_id, id, &page.domain, "failed");
            return Err(e.into());
        }
    };

    let page = state.pages().set_deployed(id, true).await?;
    publish_deployment(&state, auth_user.user_id, id, &page.domain, "deployed");
    tracing::info!("Page {} deployed to {}", id, page.domain);

    Ok(ApiResponse::success(json!({ "page": page, "deployment": report }))
        .with_message(format!("Deployed to {}", page.domain)))
}

/// POST /api/pages/:id/activation - Publish or unpublish a deployed page.
///
/// The status is stored only after the KV write succeeds. The route step is
/// best-effort and reported as `route_updated`.
pub async fn activation_post(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ActivationRequest>,
) -> ApiResult<Value> {
    if !matches!(payload.status, PageStatus::Published | PageStatus::Draft) {
        return Err(ApiError::bad_request("Status must be 'published' or 'draft'"));
    }
    let page = state.pages().get_owned(auth_user.user_id, id).await?;
    if !page.deployed {
        return Err(ApiError::bad_request("Page is not deployed"));
    }
    let client = state.cloudflare_configs().client_for_user(auth_user.user_id).await?;

    let report = Deployer::new(&client, &state.locks)
        .set_activation(&page, payload.status)
        .await?;
    let page = state.pages().set_status(id, payload.status).await?;

    let label = if report.is_active { "activated" } else { "deactivated" };
    publish_deployment(&state, auth_user.user_id, id, &page.domain, label);
    let message = match &report.route_error {
        Some(e) => format!("Page {} but the worker route was not updated: {}", label, e),
        None => format!("Page {}", label),
    };
    Ok(ApiResponse::success(json!({ "page": page, "activation": report })).with_message(message))
}

fn publish_deployment(state: &AppState, user_id: Uuid, page_id: Uuid, domain: &str, phase: &str) {
    state.events.publish(
        user_id,
        EventKind::Deployment {
            page_id,
            domain: domain.to_string(),
            state: phase.to_string(),
        },
    );
}
