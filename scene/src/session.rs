//! Session core: one signed-in user's view of the shared scene.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host feeds this type four kinds of input: user intents (pointer,
//! add, delete, save/load), scene-change payloads, presence payloads, and
//! completions of persistence work it previously returned as [`Action`]s.
//! All of it is applied synchronously to stores owned here and lent to the
//! reconciler and controller, so the host only has to serialize calls.
//!
//! LIFECYCLE
//! =========
//! 1. `sign_in` attaches the reconciler and asks for presence tracking and the
//!    initial load. Scene changes arriving before that load completes are
//!    held and replayed on top of the loaded rows.
//! 2. Intents and notifications mutate the stores; completions land later.
//! 3. `sign_out` detaches the reconciler and clears both stores. Late
//!    notifications and completions are ignored from then on.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::color::color_of;
use crate::consts::{DEFAULT_USER_NAME, SAVED_SCENE_LIST_LIMIT};
use crate::controller::InteractionController;
use crate::doc::{ObjectId, ObjectKind, SceneStore, Vec3};
use crate::error::SceneError;
use crate::input::PointerInput;
use crate::notice::{NoticeKind, NoticeQueue};
use crate::presence::{PresenceStore, PresenceUser};
use crate::reconcile::{Applied, ChangeEvent, IgnoreReason, PresenceEvent, Reconciler};
use crate::record::{ObjectRecord, SavedScene, SavedSceneRecord, to_record, to_view};

// =============================================================================
// IDENTITY
// =============================================================================

/// The acting user of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
    /// Palette color derived from `user_id`.
    pub color: String,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let color = color_of(&user_id).to_owned();
        Self { user_id, user_name: user_name.into(), color }
    }

    /// Derive the display name from account data: full name, else the local
    /// part of the email, else a generic placeholder.
    #[must_use]
    pub fn from_account(user_id: &str, full_name: Option<&str>, email: Option<&str>) -> Self {
        let name = full_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| email.and_then(|e| e.split('@').next()).filter(|s| !s.is_empty()))
            .unwrap_or(DEFAULT_USER_NAME);
        Self::new(user_id, name)
    }

    /// The presence entry this user tracks on join.
    #[must_use]
    pub fn presence(&self, now: &str) -> PresenceUser {
        PresenceUser {
            id: self.user_id.clone(),
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            color: self.color.clone(),
            position: [0.0, 0.0, 0.0],
            last_seen: now.to_owned(),
        }
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Work returned to the host. Completions come back through the matching
/// `*_completed` / `*_loaded` / `*_failed` methods on [`SessionCore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Insert a new row; the canonical row returns via [`SessionCore::insert_completed`].
    PersistInsert(ObjectRecord),
    /// Write the final position of a drag.
    PersistPosition { id: ObjectId, position: Vec3 },
    PersistDelete { id: ObjectId },
    /// Ask the user to confirm deleting `id`.
    ConfirmDelete { id: ObjectId },
    /// Fetch every scene object ordered by creation time.
    LoadScene,
    TrackPresence(PresenceUser),
    UntrackPresence { user_id: String },
    SaveScene(SavedSceneRecord),
    ListSavedScenes { owner_id: String, limit: i64 },
    /// Delete every remote object, then insert `records`.
    ReplaceRemoteScene { records: Vec<ObjectRecord> },
    DeleteSavedScene { id: String },
    /// End the identity provider session.
    EndSession,
}

// =============================================================================
// SESSION CORE
// =============================================================================

/// All state for one signed-in session.
#[derive(Debug, Clone)]
pub struct SessionCore {
    pub scene: SceneStore,
    pub presence: PresenceStore,
    pub reconciler: Reconciler,
    pub controller: InteractionController,
    pub notices: NoticeQueue,
    identity: Option<Identity>,
    saved_scenes: Vec<SavedScene>,
    /// Changes received while the initial load is in flight.
    pending_changes: Option<Vec<ChangeEvent>>,
}

impl Default for SessionCore {
    fn default() -> Self {
        Self::with_parts(Reconciler::new(), NoticeQueue::new())
    }
}

impl SessionCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a session with custom tombstone and notice lifetimes.
    #[must_use]
    pub fn with_settings(tombstone_ttl_ms: i64, notice_duration_ms: i64) -> Self {
        Self::with_parts(
            Reconciler::with_tombstone_ttl(tombstone_ttl_ms),
            NoticeQueue::with_duration(notice_duration_ms),
        )
    }

    fn with_parts(mut reconciler: Reconciler, notices: NoticeQueue) -> Self {
        reconciler.detach();
        Self {
            scene: SceneStore::new(),
            presence: PresenceStore::new(),
            reconciler,
            controller: InteractionController::new(),
            notices,
            identity: None,
            saved_scenes: Vec::new(),
            pending_changes: None,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.identity.is_some()
    }

    /// Saved scenes from the most recent list.
    #[must_use]
    pub fn saved_scenes(&self) -> &[SavedScene] {
        &self.saved_scenes
    }

    fn require_identity(&self) -> Result<&Identity, SceneError> {
        self.identity.as_ref().ok_or_else(SceneError::no_session)
    }

    fn report(&mut self, context: &str, err: &SceneError, now_ms: i64) {
        warn!(code = err.error_code(), error = %err, context, "scene operation failed");
        self.notices
            .push(NoticeKind::Error, format!("{context}: {err}"), now_ms);
    }

    // --- Lifecycle ---

    /// Start a session for `identity`. A session already in progress is ended first.
    pub fn sign_in(&mut self, identity: Identity, now: &str) -> Vec<Action> {
        let mut actions = self.sign_out();
        info!(user_id = %identity.user_id, user_name = %identity.user_name, "session started");
        self.reconciler.attach();
        actions.push(Action::TrackPresence(identity.presence(now)));
        actions.push(Action::LoadScene);
        self.pending_changes = Some(Vec::new());
        self.identity = Some(identity);
        actions
    }

    /// End the session: detach from both streams and clear both stores.
    pub fn sign_out(&mut self) -> Vec<Action> {
        let Some(identity) = self.identity.take() else {
            return Vec::new();
        };
        self.reconciler.detach();
        self.scene.clear();
        self.presence.clear();
        self.controller.reset();
        self.saved_scenes.clear();
        self.pending_changes = None;
        info!(user_id = %identity.user_id, "session ended");
        vec![Action::UntrackPresence { user_id: identity.user_id }, Action::EndSession]
    }

    /// Initial load finished. Changes held while it was in flight are
    /// replayed afterwards, whether or not the load succeeded.
    pub fn scene_loaded(&mut self, result: Result<Vec<ObjectRecord>, SceneError>, now_ms: i64) {
        if !self.is_active() {
            debug!("scene load completed after sign-out; ignored");
            return;
        }
        let pending = self.pending_changes.take().unwrap_or_default();
        match result {
            Ok(records) => {
                let objects = records
                    .into_iter()
                    .filter(|r| !self.reconciler.is_tombstoned(&r.id))
                    .map(to_view)
                    .collect();
                self.scene.replace_all(objects);
                info!(count = self.scene.len(), "scene loaded");
            }
            Err(e) => self.report("Error loading scene", &e, now_ms),
        }
        if !pending.is_empty() {
            debug!(count = pending.len(), "replaying changes held during load");
        }
        for event in &pending {
            self.reconciler
                .apply_change(&mut self.scene, event, now_ms);
        }
    }

    // --- Notifications ---

    /// Apply a raw scene-change payload.
    pub fn apply_change(&mut self, payload: &Value, now_ms: i64) -> Applied {
        if !self.reconciler.is_attached() {
            return Applied::Ignored(IgnoreReason::Detached);
        }
        match ChangeEvent::from_payload(payload) {
            Ok(event) => {
                if let Some(pending) = self.pending_changes.as_mut() {
                    pending.push(event);
                    return Applied::Deferred;
                }
                self.reconciler
                    .apply_change(&mut self.scene, &event, now_ms)
            }
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "dropping scene change payload");
                Applied::Ignored(IgnoreReason::Malformed)
            }
        }
    }

    /// Apply a raw presence payload. Returns the number of entries applied.
    pub fn apply_presence(&mut self, payload: &Value, now: &str) -> usize {
        if !self.reconciler.is_attached() {
            return 0;
        }
        match PresenceEvent::from_payload(payload) {
            Ok(event) => self
                .reconciler
                .apply_presence(&mut self.presence, &event, now),
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "dropping presence payload");
                0
            }
        }
    }

    // --- Intents ---

    /// Route a pointer event to the controller.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Precondition`] without a session.
    pub fn pointer(&mut self, input: &PointerInput) -> Result<Vec<Action>, SceneError> {
        self.require_identity()?;
        let actions = match input {
            PointerInput::Down { id, hit } => self.controller.on_pointer_down(&self.scene, id, *hit),
            PointerInput::Move { hit } => self.controller.on_pointer_move(&mut self.scene, *hit),
            PointerInput::Up => self.controller.on_pointer_up(&mut self.scene),
            PointerInput::BackgroundClick => self.controller.on_background_click(&mut self.scene),
            PointerInput::DoubleClick { id } => self.controller.on_double_click(&self.scene, id),
        };
        Ok(actions)
    }

    /// Confirm the open delete prompt. The deleted id is tombstoned so a late
    /// insert echo cannot bring it back.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Precondition`] without a session.
    pub fn confirm_delete(&mut self, now_ms: i64) -> Result<Vec<Action>, SceneError> {
        self.require_identity()?;
        let actions = self.controller.confirm_delete(&mut self.scene);
        for action in &actions {
            if let Action::PersistDelete { id } = action {
                self.reconciler.note_local_delete(id, now_ms);
            }
        }
        Ok(actions)
    }

    pub fn cancel_delete(&mut self) {
        self.controller.cancel_delete();
    }

    /// Request a new object of `kind` for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Precondition`] without a session.
    pub fn add_object<R: Rng + ?Sized>(
        &mut self,
        kind: ObjectKind,
        rng: &mut R,
        created_at: &str,
    ) -> Result<Vec<Action>, SceneError> {
        let identity = self.require_identity()?;
        Ok(self.controller.add_object(kind, identity, rng, created_at))
    }

    // --- Completions ---

    /// An insert finished. On success the canonical row joins the scene
    /// (converging with any echo that already arrived).
    pub fn insert_completed(&mut self, result: Result<ObjectRecord, SceneError>, now_ms: i64) {
        if !self.is_active() {
            debug!("insert completed after sign-out; ignored");
            return;
        }
        match result {
            Ok(record) => {
                self.reconciler.expire_tombstones(now_ms);
                if self.reconciler.is_tombstoned(&record.id) {
                    debug!(id = %record.id, "insert completed for object already deleted locally");
                    return;
                }
                self.scene.add(to_view(record));
            }
            Err(e) => self.report("Error adding object", &e, now_ms),
        }
    }

    /// A fire-and-forget write failed. Local state stays as it is.
    pub fn write_failed(&mut self, context: &str, err: &SceneError, now_ms: i64) {
        if !self.is_active() {
            return;
        }
        self.report(context, err, now_ms);
    }

    // --- Saved scenes ---

    /// Snapshot the live scene under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Validation`] for a blank name and
    /// [`SceneError::Precondition`] without a session.
    pub fn save_scene(&mut self, name: &str, id: String, created_at: &str) -> Result<Vec<Action>, SceneError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SceneError::Validation("Please enter a scene name".into()));
        }
        let identity = self.require_identity()?;
        let record = SavedSceneRecord {
            id,
            name: name.to_owned(),
            scene_data: self.scene.objects().to_vec(),
            user_id: identity.user_id.clone(),
            created_at: created_at.to_owned(),
            updated_at: None,
        };
        Ok(vec![Action::SaveScene(record)])
    }

    /// A save finished. Success refreshes the saved-scene list.
    pub fn scene_saved(&mut self, result: Result<(), SceneError>, now_ms: i64) -> Vec<Action> {
        if !self.is_active() {
            return Vec::new();
        }
        match result {
            Ok(()) => {
                self.notices
                    .push(NoticeKind::Success, "Scene saved successfully!", now_ms);
                self.list_saved_scenes().unwrap_or_default()
            }
            Err(e) => {
                self.report("Error saving scene", &e, now_ms);
                Vec::new()
            }
        }
    }

    /// Ask for this user's most recent saved scenes.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Precondition`] without a session.
    pub fn list_saved_scenes(&self) -> Result<Vec<Action>, SceneError> {
        let identity = self.require_identity()?;
        Ok(vec![Action::ListSavedScenes { owner_id: identity.user_id.clone(), limit: SAVED_SCENE_LIST_LIMIT }])
    }

    pub fn saved_scenes_listed(&mut self, result: Result<Vec<SavedScene>, SceneError>, now_ms: i64) {
        if !self.is_active() {
            return;
        }
        match result {
            Ok(scenes) => self.saved_scenes = scenes,
            Err(e) => self.report("Error loading saved scenes", &e, now_ms),
        }
    }

    /// Replace the shared scene with a saved snapshot. The live set changes
    /// once the remote replacement succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Validation`] for an id missing from the list and
    /// [`SceneError::Precondition`] without a session.
    pub fn load_saved_scene(&self, id: &str) -> Result<Vec<Action>, SceneError> {
        self.require_identity()?;
        let saved = self
            .saved_scenes
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SceneError::Validation(format!("unknown saved scene: {id}")))?;
        let records = saved.objects.iter().map(to_record).collect();
        Ok(vec![Action::ReplaceRemoteScene { records }])
    }

    /// The remote replacement finished; swap the live set wholesale.
    pub fn saved_scene_loaded(&mut self, result: Result<Vec<ObjectRecord>, SceneError>, now_ms: i64) {
        if !self.is_active() {
            return;
        }
        match result {
            Ok(records) => {
                self.reconciler
                    .lift_tombstones(records.iter().map(|r| r.id.as_str()));
                self.controller.reset();
                self.scene
                    .replace_all(records.into_iter().map(to_view).collect());
                self.scene.select(None);
                self.scene.set_dragging(false);
                self.notices
                    .push(NoticeKind::Success, "Scene loaded successfully!", now_ms);
            }
            Err(e) => self.report("Error loading scene", &e, now_ms),
        }
    }

    /// Delete a saved scene.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Precondition`] without a session.
    pub fn delete_saved_scene(&self, id: &str) -> Result<Vec<Action>, SceneError> {
        self.require_identity()?;
        Ok(vec![Action::DeleteSavedScene { id: id.to_owned() }])
    }

    /// A saved-scene delete finished. Success drops it locally and refreshes the list.
    pub fn saved_scene_deleted(&mut self, id: &str, result: Result<(), SceneError>, now_ms: i64) -> Vec<Action> {
        if !self.is_active() {
            return Vec::new();
        }
        match result {
            Ok(()) => {
                self.saved_scenes.retain(|s| s.id != id);
                self.list_saved_scenes().unwrap_or_default()
            }
            Err(e) => {
                self.report("Error deleting scene", &e, now_ms);
                Vec::new()
            }
        }
    }

    // --- Housekeeping ---

    /// Auto-dismiss expired notices.
    pub fn expire_notices(&mut self, now_ms: i64) {
        self.notices.expire(now_ms);
    }
}
