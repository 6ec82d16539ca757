// handlers/protected/pages/mod.rs - Maintenance page management
//
// crud.rs    GET|POST /api/pages, GET|PUT|DELETE /api/pages/:id, archive, preview, analytics
// deploy.rs  POST /api/pages/:id/deploy, POST /api/pages/:id/activation

pub mod crud;
pub mod deploy;

use uuid::Uuid;

use crate::handlers::publish_plan_state;
use crate::state::AppState;

/// Page-count changes are pushed best-effort; the request already succeeded
async fn refresh_plan_state(state: &AppState, user_id: Uuid) {
    let result = match state.users().get(user_id).await {
        Ok(user) => publish_plan_state(state, &user).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        tracing::warn!("Could not publish plan state for {}: {}", user_id, e);
    }
}
