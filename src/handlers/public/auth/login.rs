// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use super::utils::token_response;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/**
 * POST /auth/login - Authenticate and receive a JWT
 *
 * Expected Input:
 * ```json
 * { "email": "owner@example.com", "password": "..." }
 * ```
 *
 * Expected Output:
 * ```json
 * { "success": true, "data": { "token": "eyJ...", "user": { ... }, "expires_in": 604800 } }
 * ```
 */
pub async fn login_post(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Value> {
    let user = state.users().authenticate(&payload.email, &payload.password).await?;
    tracing::info!("User {} logged in", user.id);
    Ok(ApiResponse::success(token_response(&state, &user)?))
}
