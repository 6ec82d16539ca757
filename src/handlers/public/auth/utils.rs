use serde_json::{json, Value};

use crate::auth::{generate_jwt_with_secret, Claims};
use crate::database::models::user::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Sign a token for `user` and build the login/register response body
pub(super) fn token_response(state: &AppState, user: &User) -> Result<Value, ApiError> {
    let claims = Claims::new(user.id, user.email.clone(), user.role);
    let token = generate_jwt_with_secret(&claims, &state.config.security.jwt_secret)?;

    Ok(json!({
        "token": token,
        "user": user,
        "expires_in": state.config.security.jwt_expiry_hours * 3600
    }))
}
