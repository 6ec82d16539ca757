// handlers/public/auth/register.rs - POST /auth/register handler

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use super::utils::token_response;
use crate::database::models::user::Role;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
}

/// POST /auth/register - Create a password account on the free plan and sign it in
pub async fn register_post(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Value> {
    let user = state
        .users()
        .register(&payload.email, &payload.name, &payload.password, Role::User)
        .await?;
    Ok(ApiResponse::created(token_response(&state, &user)?))
}
