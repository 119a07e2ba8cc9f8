//! Presence model: connected peers and their last-known position.
//!
//! Presence is ephemeral. It is never persisted and there is no optimistic
//! local mutation; entries arrive only through the presence stream.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{DEFAULT_PRESENCE_COLOR, DEFAULT_USER_NAME};
use crate::doc::Vec3;

/// A connected participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUser {
    /// Presence-session key; changes when the same user re-joins.
    pub id: String,
    /// Stable user identity; the store key.
    pub user_id: String,
    /// Display name.
    pub user_name: String,
    /// Display color (hex).
    pub color: String,
    /// Last-known avatar position.
    pub position: Vec3,
    /// When this entry was last refreshed. Informational only.
    pub last_seen: String,
}

/// The store key of a raw presence entry: its trimmed, non-empty `userId`.
#[must_use]
pub fn presence_key(value: &Value) -> Option<&str> {
    value
        .get("userId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Build a presence entry from a raw stream payload, filling defaults.
///
/// Returns `None` when the payload has no usable `userId`; such entries are
/// dropped by the caller.
#[must_use]
pub fn parse_presence(value: &Value, now: &str) -> Option<PresenceUser> {
    let user_id = presence_key(value)?.to_owned();

    let id = value
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map_or_else(|| user_id.clone(), str::to_owned);
    let user_name = value
        .get("userName")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_USER_NAME)
        .to_owned();
    let color = value
        .get("color")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_PRESENCE_COLOR)
        .to_owned();
    let position = value
        .get("position")
        .and_then(|v| serde_json::from_value::<Vec3>(v.clone()).ok())
        .unwrap_or([0.0, 0.0, 0.0]);

    Some(PresenceUser { id, user_id, user_name, color, position, last_seen: now.to_owned() })
}

/// In-memory store of connected peers, keyed by `user_id`.
#[derive(Debug, Clone, Default)]
pub struct PresenceStore {
    users: HashMap<String, PresenceUser>,
}

impl PresenceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `user.user_id`.
    pub fn upsert(&mut self, user: PresenceUser) {
        self.users.insert(user.user_id.clone(), user);
    }

    /// Remove a peer by user id, returning the entry if it was present.
    pub fn remove(&mut self, user_id: &str) -> Option<PresenceUser> {
        self.users.remove(user_id)
    }

    /// Look up a peer by user id.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&PresenceUser> {
        self.users.get(user_id)
    }

    /// All connected peers. Order is unspecified.
    #[must_use]
    pub fn list(&self) -> Vec<&PresenceUser> {
        self.users.values().collect()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.users.clear();
    }

    /// Number of connected peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
