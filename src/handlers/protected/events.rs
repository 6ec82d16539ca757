// handlers/protected/events.rs - GET /api/events (Server-Sent Events)

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

use crate::middleware::AuthUser;
use crate::state::AppState;

/// Live plan, limit and deployment updates for the caller.
/// The first event is always `{"type":"connected"}`.
pub async fn events_get(
    Extension(state): Extension<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("SSE connection opened for {}", auth_user.user_id);
    let stream = state.events.stream_for(auth_user.user_id).map(|kind| {
        let event = Event::default().json_data(&kind).unwrap_or_else(|e| {
            tracing::warn!("Failed to encode live event: {}", e);
            Event::default().comment("encoding error")
        });
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
