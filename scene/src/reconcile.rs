//! Change reconciler: folds asynchronous notifications into the local stores.
//!
//! DESIGN
//! ======
//! The transport gives at-least-once delivery with no total order and no
//! transaction boundaries. Reconciliation applies what arrives and converges
//! regardless of duplication or arrival order: inserts overwrite by id, and
//! updates or deletes on missing objects are no-ops.
//!
//! The one ordering hazard is a local delete racing this client's own insert
//! echo. Ids deleted locally are kept as short-lived tombstones and a late
//! insert for a tombstoned id is ignored, so delete wins. Remote deletes are
//! not tombstoned.
//!
//! ERROR HANDLING
//! ==============
//! Malformed payloads are logged and dropped. Nothing here returns an error
//! to the caller; the outcome enum says what happened.

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod reconcile_test;

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::consts::DEFAULT_TOMBSTONE_TTL_MS;
use crate::doc::{ObjectId, PartialSceneObject, SceneStore};
use crate::error::SceneError;
use crate::presence::{PresenceStore, parse_presence, presence_key};
use crate::record::{ObjectRecord, to_view};

// =============================================================================
// EVENTS
// =============================================================================

/// Row-level operation reported by the change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One scene-object change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    /// The row after the change (insert/update) or the deleted row's key (delete).
    pub record: Value,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(op: ChangeOp, record: Value) -> Self {
        Self { op, record }
    }

    /// Parse a raw stream payload.
    ///
    /// Accepts `{ "op": "insert", "record": {..} }` as well as the hosted
    /// realtime shape `{ "eventType": "INSERT", "new": {..}, "old": {..} }`,
    /// where deletes carry the key in `old`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::StreamDelivery`] when the operation is unknown or
    /// the record is missing.
    pub fn from_payload(payload: &Value) -> Result<Self, SceneError> {
        if let Some(raw_op) = payload.get("op").and_then(Value::as_str) {
            let op = ChangeOp::parse(raw_op)
                .ok_or_else(|| SceneError::StreamDelivery(format!("unknown change op: {raw_op}")))?;
            let record = payload
                .get("record")
                .filter(|v| v.is_object())
                .cloned()
                .ok_or_else(|| SceneError::StreamDelivery("change event without record".into()))?;
            return Ok(Self { op, record });
        }

        let raw_op = payload
            .get("eventType")
            .and_then(Value::as_str)
            .ok_or_else(|| SceneError::StreamDelivery("change event without op".into()))?;
        let op = ChangeOp::parse(raw_op)
            .ok_or_else(|| SceneError::StreamDelivery(format!("unknown change op: {raw_op}")))?;
        let key = if op == ChangeOp::Delete { "old" } else { "new" };
        let record = payload
            .get(key)
            .filter(|v| v.is_object())
            .cloned()
            .ok_or_else(|| SceneError::StreamDelivery(format!("change event without `{key}` row")))?;
        Ok(Self { op, record })
    }
}

/// One presence notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    /// Full snapshot of every tracked presence.
    Sync(Vec<Value>),
    /// Newly joined presences.
    Join(Vec<Value>),
    /// Departed presences.
    Leave(Vec<Value>),
}

impl PresenceEvent {
    /// Parse a raw presence payload.
    ///
    /// Shapes: `{ "event": "sync", "presences": [..] }` or
    /// `{ "event": "sync", "state": { key: [..] } }`,
    /// `{ "event": "join", "newPresences": [..] }`,
    /// `{ "event": "leave", "leftPresences": [..] }`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::StreamDelivery`] for unknown events or missing lists.
    pub fn from_payload(payload: &Value) -> Result<Self, SceneError> {
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .ok_or_else(|| SceneError::StreamDelivery("presence event without kind".into()))?;
        match event {
            "sync" => {
                if let Some(list) = payload.get("presences").and_then(Value::as_array) {
                    return Ok(Self::Sync(list.clone()));
                }
                let state = payload
                    .get("state")
                    .and_then(Value::as_object)
                    .ok_or_else(|| SceneError::StreamDelivery("sync without presences".into()))?;
                let entries = state
                    .values()
                    .flat_map(|v| match v {
                        Value::Array(items) => items.clone(),
                        other => vec![other.clone()],
                    })
                    .collect();
                Ok(Self::Sync(entries))
            }
            "join" => presence_list(payload, "newPresences").map(Self::Join),
            "leave" => presence_list(payload, "leftPresences").map(Self::Leave),
            other => Err(SceneError::StreamDelivery(format!("unknown presence event: {other}"))),
        }
    }
}

fn presence_list(payload: &Value, key: &str) -> Result<Vec<Value>, SceneError> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| SceneError::StreamDelivery(format!("presence event without `{key}`")))
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str).filter(|s| !s.is_empty())
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Why a notification left the stores untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The reconciler was detached from its streams.
    Detached,
    /// The id was deleted locally and its tombstone is still live.
    Tombstoned,
    /// The target object is not in the scene.
    Missing,
    /// The payload could not be interpreted.
    Malformed,
}

/// What a scene change did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A new object was appended.
    Inserted,
    /// An insert matched an existing id and overwrote it.
    Replaced,
    Updated,
    Removed,
    /// Held until the initial scene load lands, then replayed.
    Deferred,
    Ignored(IgnoreReason),
}

// =============================================================================
// RECONCILER
// =============================================================================

/// Applies change and presence notifications to injected stores.
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Locally deleted ids mapped to the time of deletion (ms).
    tombstones: HashMap<ObjectId, i64>,
    tombstone_ttl_ms: i64,
    attached: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::with_tombstone_ttl(DEFAULT_TOMBSTONE_TTL_MS)
    }
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tombstone_ttl(tombstone_ttl_ms: i64) -> Self {
        Self { tombstones: HashMap::new(), tombstone_ttl_ms, attached: true }
    }

    // --- Stream lifecycle ---

    /// Stop applying notifications. Anything delivered afterwards is a no-op.
    pub fn detach(&mut self) {
        self.attached = false;
        self.tombstones.clear();
    }

    /// Resume applying notifications.
    pub fn attach(&mut self) {
        self.attached = true;
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    // --- Tombstones ---

    /// Record that this client deleted `id`, so a late insert echo is rejected.
    pub fn note_local_delete(&mut self, id: &str, now_ms: i64) {
        self.tombstones.insert(id.to_owned(), now_ms);
    }

    /// Lift tombstones for ids that are being deliberately re-created.
    pub fn lift_tombstones<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.tombstones.remove(id);
        }
    }

    #[must_use]
    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }

    #[cfg(test)]
    pub(crate) fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    /// Drop tombstones older than the TTL.
    pub fn expire_tombstones(&mut self, now_ms: i64) {
        let ttl = self.tombstone_ttl_ms;
        self.tombstones
            .retain(|_, deleted_at| now_ms.saturating_sub(*deleted_at) < ttl);
    }

    // --- Scene changes ---

    /// Apply one scene-object change to `scene`.
    pub fn apply_change(&mut self, scene: &mut SceneStore, event: &ChangeEvent, now_ms: i64) -> Applied {
        if !self.attached {
            return Applied::Ignored(IgnoreReason::Detached);
        }
        self.expire_tombstones(now_ms);

        match event.op {
            ChangeOp::Insert => {
                let record = match ObjectRecord::from_value(&event.record) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(error = %e, "dropping malformed insert");
                        return Applied::Ignored(IgnoreReason::Malformed);
                    }
                };
                if self.is_tombstoned(&record.id) {
                    debug!(id = %record.id, "insert echo for locally deleted object ignored");
                    return Applied::Ignored(IgnoreReason::Tombstoned);
                }
                if scene.add(to_view(record)) { Applied::Inserted } else { Applied::Replaced }
            }
            ChangeOp::Update => {
                let Some(id) = record_id(&event.record) else {
                    warn!("dropping update without id");
                    return Applied::Ignored(IgnoreReason::Malformed);
                };
                let partial = match serde_json::from_value::<PartialSceneObject>(event.record.clone()) {
                    Ok(partial) => partial,
                    Err(e) => {
                        warn!(%id, error = %e, "dropping malformed update");
                        return Applied::Ignored(IgnoreReason::Malformed);
                    }
                };
                if scene.update(id, &partial) {
                    Applied::Updated
                } else {
                    debug!(%id, "update for absent object ignored");
                    Applied::Ignored(IgnoreReason::Missing)
                }
            }
            ChangeOp::Delete => {
                let Some(id) = record_id(&event.record) else {
                    warn!("dropping delete without id");
                    return Applied::Ignored(IgnoreReason::Malformed);
                };
                if scene.remove(id).is_some() {
                    Applied::Removed
                } else {
                    Applied::Ignored(IgnoreReason::Missing)
                }
            }
        }
    }

    // --- Presence ---

    /// Apply one presence notification. Returns how many entries changed the
    /// store; entries without a `userId` and leaves for unknown peers are dropped.
    pub fn apply_presence(&mut self, presence: &mut PresenceStore, event: &PresenceEvent, now: &str) -> usize {
        if !self.attached {
            return 0;
        }

        match event {
            PresenceEvent::Sync(entries) | PresenceEvent::Join(entries) => {
                let mut applied = 0;
                for entry in entries {
                    if let Some(user) = parse_presence(entry, now) {
                        presence.upsert(user);
                        applied += 1;
                    } else {
                        warn!(%entry, "dropping presence entry without userId");
                    }
                }
                applied
            }
            PresenceEvent::Leave(entries) => {
                let mut applied = 0;
                for entry in entries {
                    let Some(user_id) = presence_key(entry) else {
                        warn!(%entry, "dropping leave entry without userId");
                        continue;
                    };
                    if presence.remove(user_id).is_some() {
                        applied += 1;
                    } else {
                        debug!(%user_id, "leave for unknown peer ignored");
                    }
                }
                applied
            }
        }
    }
}
