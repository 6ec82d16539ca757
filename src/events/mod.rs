//! Process-wide live update hub.
//!
//! Services publish [`UserEvent`]s; each SSE connection subscribes and
//! keeps only the events addressed to its user. Nothing is persisted, and
//! a receiver that falls behind skips the events it missed.

use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::database::models::user::SubscriptionStatus;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Connected,
    Subscription {
        plan: String,
        status: SubscriptionStatus,
    },
    Limits {
        pages: i32,
        views_per_page: i64,
    },
    PageCount {
        page_count: i64,
        can_create: bool,
    },
    Deployment {
        page_id: Uuid,
        domain: String,
        state: String,
    },
}

#[derive(Debug, Clone)]
pub struct UserEvent {
    pub user_id: Uuid,
    pub kind: EventKind,
}

#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<UserEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish to every connected subscriber; a no-op when nobody listens
    pub fn publish(&self, user_id: Uuid, kind: EventKind) {
        match self.sender.send(UserEvent { user_id, kind }) {
            Ok(receivers) => tracing::debug!("Published user event to {} receivers", receivers),
            Err(_) => tracing::debug!("No live update subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UserEvent> {
        self.sender.subscribe()
    }

    /// Events for one user, starting with `Connected`
    pub fn stream_for(&self, user_id: Uuid) -> impl Stream<Item = EventKind> + Send + 'static {
        let updates = BroadcastStream::new(self.subscribe()).filter_map(move |item| match item {
            Ok(event) if event.user_id == user_id => Some(event.kind),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Live update stream for {} skipped {} events", user_id, skipped);
                None
            }
        });
        tokio_stream::once(EventKind::Connected).chain(updates)
    }
}
