// handlers/public/edge.rs - GET /edge
//
// Serves the same replies as the deployed worker, resolving the request's
// Host against deployed pages instead of KV.

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::edge::{normalize_host, respond, EdgeRecord, EdgeReply};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn edge_get(headers: HeaderMap, Extension(state): Extension<AppState>) -> Result<Response, ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(normalize_host)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing Host header"))?;

    let stored = match state.pages().find_deployed_by_domain(&host).await? {
        Some(page) => Some(serde_json::to_string(&EdgeRecord::from_page(&page)).map_err(|e| {
            tracing::error!("Failed to serialize edge record for {}: {}", host, e);
            ApiError::internal_server_error("Failed to build edge record")
        })?),
        None => None,
    };

    Ok(match respond(&host, stored.as_deref()) {
        EdgeReply::Page(html) => Html(html).into_response(),
        EdgeReply::Redirect(target) => Redirect::temporary(&target).into_response(),
        EdgeReply::NotFound => (StatusCode::NOT_FOUND, "Maintenance page not found").into_response(),
        EdgeReply::Invalid => (StatusCode::INTERNAL_SERVER_ERROR, "Invalid maintenance page data").into_response(),
    })
}
