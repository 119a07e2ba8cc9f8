//! Realtime feed — scene changes and presence over Postgres `LISTEN/NOTIFY`.
//!
//! DESIGN
//! ======
//! The `scene_objects` trigger publishes `{eventType, new, old}` on
//! [`SCENE_CHANNEL`]. Presence has no table: track and untrack publish
//! `join` / `leave` payloads on [`PRESENCE_CHANNEL`] directly. One listener
//! task forwards both channels into the session actor as raw JSON; parsing
//! and validation happen in the actor so malformed payloads are dropped in
//! one place.
//!
//! Notifications sent while the listener is reconnecting are lost. The actor
//! never assumes ordering.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use scene::presence::{PresenceUser, presence_key};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::session::SessionInput;
use crate::store::StoreError;

pub const SCENE_CHANNEL: &str = "scene_changes";
pub const PRESENCE_CHANNEL: &str = "presence";

// =============================================================================
// PRESENCE PUBLISHING
// =============================================================================

#[async_trait::async_trait]
pub trait PresenceChannel: Send + Sync {
    /// Announce `user` to every listener.
    async fn track(&self, user: &PresenceUser) -> Result<(), StoreError>;

    /// Announce that `user_id` left.
    async fn untrack(&self, user_id: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgPresenceChannel {
    pool: PgPool,
}

impl PgPresenceChannel {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn publish(&self, payload: &Value) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(PRESENCE_CHANNEL)
            .bind(payload.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PresenceChannel for PgPresenceChannel {
    async fn track(&self, user: &PresenceUser) -> Result<(), StoreError> {
        self.publish(&join_payload(user)).await
    }

    async fn untrack(&self, user_id: &str) -> Result<(), StoreError> {
        self.publish(&leave_payload(user_id)).await
    }
}

#[must_use]
pub fn join_payload(user: &PresenceUser) -> Value {
    json!({ "event": "join", "newPresences": [user] })
}

#[must_use]
pub fn leave_payload(user_id: &str) -> Value {
    json!({ "event": "leave", "leftPresences": [{ "userId": user_id }] })
}

/// Store keys announced by a `join` payload. Empty for any other payload.
#[must_use]
pub fn joined_user_ids(payload: &Value) -> Vec<&str> {
    if payload.get("event").and_then(Value::as_str) != Some("join") {
        return Vec::new();
    }
    payload
        .get("newPresences")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(presence_key)
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// LISTENER
// =============================================================================

/// Map one notification to actor input. Unknown channels and non-JSON
/// payloads are dropped.
#[must_use]
pub fn route(channel: &str, payload: &str) -> Option<SessionInput> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!(%channel, error = %e, "dropping non-JSON notification");
            return None;
        }
    };
    match channel {
        SCENE_CHANNEL => Some(SessionInput::Change(value)),
        PRESENCE_CHANNEL => Some(SessionInput::Presence(value)),
        other => {
            debug!(channel = %other, "notification on unexpected channel ignored");
            None
        }
    }
}

/// Subscribe to both channels and spawn the forwarding task.
///
/// # Errors
///
/// Returns a database error if the listener cannot connect or subscribe.
pub async fn spawn_feed(pool: &PgPool, tx: mpsc::Sender<SessionInput>) -> Result<JoinHandle<()>, StoreError> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener
        .listen_all([SCENE_CHANNEL, PRESENCE_CHANNEL])
        .await?;
    info!(channels = ?[SCENE_CHANNEL, PRESENCE_CHANNEL], "feed subscribed");

    Ok(tokio::spawn(async move {
        loop {
            let notification = match listener.recv().await {
                Ok(notification) => notification,
                Err(e) => {
                    error!(error = %e, "feed listener failed");
                    break;
                }
            };
            let Some(input) = route(notification.channel(), notification.payload()) else {
                continue;
            };
            if tx.send(input).await.is_err() {
                debug!("session closed; feed stopping");
                break;
            }
        }
    }))
}
