// handlers/public/pages.rs - Published page views

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::page::{MaintenancePage, PageStatus};
use crate::edge::EdgeRecord;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::render::render_page;
use crate::services::page_service::ViewCount;
use crate::state::AppState;

/// GET /p/:id - Render a published page and count the view
pub async fn page_view(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Extension(state): Extension<AppState>,
) -> Result<Response, ApiError> {
    let page = published_page(&state, id).await?;
    let first_visit = !has_visitor_cookie(&headers, id);
    count_view(&state, &page, first_visit).await?;

    let html = render_page(&EdgeRecord::from_page(&page));
    let mut response = Html(html).into_response();
    if first_visit {
        let cookie = visitor_cookie(id, state.config.pages.visitor_cookie_max_age_secs);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("Could not set visitor cookie for page {}: {}", id, e),
        }
    }
    Ok(response)
}

/// POST /p/:id/view - Count a view without rendering
pub async fn page_track(
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Extension(state): Extension<AppState>,
) -> ApiResult<Value> {
    let page = published_page(&state, id).await?;
    let count = count_view(&state, &page, !has_visitor_cookie(&headers, id)).await?;
    Ok(ApiResponse::success(json!({
        "total_views": count.total_views,
        "unique_views": count.unique_views
    })))
}

async fn published_page(state: &AppState, id: Uuid) -> Result<MaintenancePage, ApiError> {
    let page = state.pages().get(id).await?;
    if page.status != PageStatus::Published {
        return Err(ApiError::not_found("Page not found"));
    }
    Ok(page)
}

async fn count_view(state: &AppState, page: &MaintenancePage, unique: bool) -> Result<ViewCount, ApiError> {
    let owner = state.users().get(page.user_id).await?;
    let limits = state.plans().limits_for(&owner).await?;
    Ok(state.pages().record_view(page.id, unique, limits.views_per_page).await?)
}

fn cookie_name(id: Uuid) -> String {
    format!("visitor_{}", id)
}

fn visitor_cookie(id: Uuid, max_age_secs: i64) -> String {
    format!("{}=1; Max-Age={}; Path=/; HttpOnly; SameSite=Lax", cookie_name(id), max_age_secs)
}

fn has_visitor_cookie(headers: &HeaderMap, id: Uuid) -> bool {
    let name = cookie_name(id);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(key, _)| key == name)
}
