use axum::{
    extract::{Extension, Path, Query},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::refresh_plan_state;
use crate::cloudflare::Deployer;
use crate::database::models::page::{MaintenancePage, PageStatus};
use crate::edge::EdgeRecord;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::render::render_page;
use crate::services::page_service::{check_update, relocation_target, PageAnalytics};
use crate::services::PageInput;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Delete the record even if the edge teardown fails
    #[serde(default)]
    pub force: bool,
}

/// GET /api/pages
pub async fn list(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<MaintenancePage>> {
    let pages = state.pages().list_for_user(auth_user.user_id).await?;
    Ok(ApiResponse::success(pages))
}

/// POST /api/pages - Create a page within the plan's page limit
pub async fn create(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<PageInput>,
) -> ApiResult<MaintenancePage> {
    let user = state.users().get(auth_user.user_id).await?;
    if !user.has_active_subscription(Utc::now()) {
        return Err(ApiError::forbidden("An active subscription is required to create pages"));
    }
    let limits = state.plans().limits_for(&user).await?;

    let page = state.pages().create(user.id, input, limits.pages).await?;
    tracing::info!("User {} created page {} for {}", user.id, page.id, page.domain);
    refresh_plan_state(&state, user.id).await;
    Ok(ApiResponse::created(page))
}

/// GET /api/pages/:id
pub async fn get(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<MaintenancePage> {
    Ok(ApiResponse::success(state.pages().get_owned(auth_user.user_id, id).await?))
}

/// PUT /api/pages/:id
///
/// A deployed page gets its KV record re-written. A sync failure is logged
/// and reported as `edge_synced: false`; the database update stands.
/// Changing the domain of a deployed page moves the deployment.
pub async fn update(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(input): Json<PageInput>,
) -> ApiResult<Value> {
    let current = state.pages().get_owned(auth_user.user_id, id).await?;
    if let Some(new_domain) = relocation_target(&current, &input) {
        return relocate(&state, auth_user.user_id, current, input, new_domain).await;
    }

    let page = state.pages().update(auth_user.user_id, id, input).await?;

    let edge_synced = if page.deployed {
        Some(sync_edge(&state, auth_user.user_id, &page).await)
    } else {
        None
    };
    Ok(ApiResponse::success(json!({ "page": page, "edge_synced": edge_synced })))
}

/// Tear down the old domain, store the update, then deploy under the new
/// domain. A teardown failure aborts before anything is written. A failed
/// deploy leaves the page marked deployed so deletion still cleans up.
async fn relocate(
    state: &AppState,
    user_id: Uuid,
    current: MaintenancePage,
    input: PageInput,
    new_domain: String,
) -> ApiResult<Value> {
    check_update(&current, &input)?;
    let client = state.cloudflare_configs().client_for_user(user_id).await?;
    let deployer = Deployer::new(&client, &state.locks);

    let teardown = deployer.teardown(&current.domain).await?;
    tracing::info!("Moving page {} from {} to {}", current.id, current.domain, new_domain);
    let page = state.pages().update(user_id, current.id, input).await?;

    let (deployment, edge_error) = match deployer.deploy(&page).await {
        Ok(report) => (Some(report), None),
        Err(e) => {
            tracing::warn!("Deploy of page {} to {} failed: {}", page.id, page.domain, e);
            (None, Some(e.to_string()))
        }
    };

    Ok(ApiResponse::success(json!({
        "page": page,
        "edge_synced": deployment.is_some(),
        "previous_domain": current.domain,
        "teardown": teardown,
        "deployment": deployment,
        "edge_error": edge_error
    })))
}

async fn sync_edge(state: &AppState, user_id: Uuid, page: &MaintenancePage) -> bool {
    let client = match state.cloudflare_configs().client_for_user(user_id).await {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Skipping edge sync for page {}: {}", page.id, e);
            return false;
        }
    };
    match Deployer::new(&client, &state.locks).sync_content(page).await {
        Ok(()) => {
            tracing::info!("Synced edge record for {}", page.domain);
            true
        }
        Err(e) => {
            tracing::warn!("Edge sync for {} failed: {}", page.domain, e);
            false
        }
    }
}

/// DELETE /api/pages/:id?force=true
///
/// Tears down the edge deployment first. If that fails the record is kept
/// unless `force` is set.
pub async fn delete(
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let page = state.pages().get_owned(auth_user.user_id, id).await?;

    let has_config = state
        .cloudflare_configs()
        .get(auth_user.user_id)
        .await?
        .map_or(false, |config| config.is_active);
    let domain_in_use = state
        .pages()
        .find_deployed_by_domain(&page.domain)
        .await?
        .map_or(false, |other| other.id != page.id && other.user_id == page.user_id);
    let cleanup = edge_cleanup(page.deployed, has_config, domain_in_use);

    let mut teardown = None;
    let mut teardown_error = None;
    if cleanup != EdgeCleanup::Skip {
        let result = match state.cloudflare_configs().client_for_user(auth_user.user_id).await {
            Ok(client) => Deployer::new(&client, &state.locks)
                .teardown(&page.domain)
                .await
                .map_err(ApiError::from),
            Err(e) => Err(ApiError::from(e)),
        };
        match result {
            Ok(report) => teardown = Some(report),
            Err(e) if query.force || cleanup == EdgeCleanup::BestEffort => {
                tracing::warn!("Deleting page {} after failed teardown: {}", id, e);
                teardown_error = Some(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    state.pages().delete(auth_user.user_id, id).await?;
    tracing::info!("Deleted page {} ({})", id, page.domain);
    refresh_plan_state(&state, auth_user.user_id).await;

    Ok(ApiResponse::success(json!({
        "id": id,
        "deleted": true,
        "teardown": teardown,
        "teardown_error": teardown_error
    })))
}

/// Edge cleanup owed by a page that is about to be deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeCleanup {
    /// Deployed: a failed teardown keeps the record unless forced
    Required,
    /// Never marked deployed, but a failed first deploy may have left KV behind
    BestEffort,
    Skip,
}

fn edge_cleanup(deployed: bool, has_config: bool, domain_in_use: bool) -> EdgeCleanup {
    match (deployed, has_config, domain_in_use) {
        (true, _, _) => EdgeCleanup::Required,
        (false, true, false) => EdgeCleanup::BestEffort,
        _ => EdgeCleanup::Skip,
    }
}

/// POST /api/pages/:id/archive
///
/// A deployed page is deactivated at the edge first: the KV record turns
/// inactive and the route is detached. The status is stored only after the
/// KV write succeeds.
pub async fn archive(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Value> {
    let page = state.pages().get_owned(auth_user.user_id, id).await?;

    let activation = if page.deployed {
        let client = state.cloudflare_configs().client_for_user(auth_user.user_id).await?;
        let report = Deployer::new(&client, &state.locks)
            .set_activation(&page, PageStatus::Archived)
            .await?;
        Some(report)
    } else {
        None
    };

    let page = state.pages().set_status(page.id, PageStatus::Archived).await?;
    tracing::info!("Archived page {} ({})", id, page.domain);
    Ok(ApiResponse::success(json!({ "page": page, "activation": activation })))
}

/// GET /api/pages/:id/preview - Rendered HTML regardless of status; no view is counted
pub async fn preview(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let page = state.pages().get_owned(auth_user.user_id, id).await?;
    Ok(Html(render_page(&EdgeRecord::from_page(&page))).into_response())
}

/// GET /api/pages/:id/analytics - Totals plus the last 90 days
pub async fn analytics(
    Path(id): Path<Uuid>,
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<PageAnalytics> {
    Ok(ApiResponse::success(state.pages().analytics(auth_user.user_id, id).await?))
}
