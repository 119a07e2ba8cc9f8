//! Session actor — the single writer over a [`SessionCore`].
//!
//! DESIGN
//! ======
//! Everything that can change the local scene arrives on one `mpsc` channel:
//! driver commands, feed notifications, and completions of persistence work.
//! The actor applies each input to the core synchronously, then turns the
//! returned [`Action`]s into spawned tasks. Each task sends its result back
//! into the same channel as a [`Completion`], so a write's completion and its
//! feed echo race exactly as they would against a hosted backend.
//!
//! LIFECYCLE
//! =========
//! `start` signs the core in. A `sign_out` command detaches the core and ends
//! the provider session; the loop stops once that completion arrives or on
//! [`SessionInput::Shutdown`].

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use scene::doc::ObjectKind;
use scene::error::SceneError;
use scene::input::PointerInput;
use scene::notice::NoticeKind;
use scene::record::{ObjectRecord, SavedScene};
use scene::session::{Action, Identity, SessionCore};
use serde::Deserialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::auth::{AuthError, IdentityProvider};
use crate::services::feed::{PresenceChannel, joined_user_ids};
use crate::store::SceneRepository;

/// How often expired notices are swept.
pub const NOTICE_TICK: Duration = Duration::from_millis(250);

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Debug)]
pub enum SessionInput {
    Command(SessionCommand),
    /// Raw scene-change payload from the feed.
    Change(Value),
    /// Raw presence payload from the feed.
    Presence(Value),
    Completed(Completion),
    Shutdown,
}

/// One line of driver input, e.g. `{"command":"add","kind":"cube"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    Pointer { input: PointerInput },
    Add { kind: ObjectKind },
    ConfirmDelete,
    CancelDelete,
    SaveScene { name: String },
    ListSavedScenes,
    LoadSavedScene { id: String },
    DeleteSavedScene { id: String },
    DismissNotice { id: u64 },
    Status,
    SignOut,
}

/// Result of one spawned persistence task.
#[derive(Debug)]
pub enum Completion {
    SceneLoaded(Result<Vec<ObjectRecord>, SceneError>),
    Inserted(Result<ObjectRecord, SceneError>),
    /// Fire-and-forget write; only failures matter.
    Written { context: &'static str, result: Result<(), SceneError> },
    SceneSaved(Result<(), SceneError>),
    SavedScenesListed(Result<Vec<SavedScene>, SceneError>),
    SceneReplaced(Result<Vec<ObjectRecord>, SceneError>),
    SavedSceneDeleted { id: String, result: Result<(), SceneError> },
    PresencePublished(Result<(), SceneError>),
    SessionEnded(Result<(), AuthError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// External collaborators the actor executes actions against.
#[derive(Clone)]
pub struct Collaborators {
    pub repo: Arc<dyn SceneRepository>,
    pub presence: Arc<dyn PresenceChannel>,
    pub auth: Arc<dyn IdentityProvider>,
}

// =============================================================================
// ACTOR
// =============================================================================

pub struct SessionActor {
    core: SessionCore,
    deps: Collaborators,
    tx: mpsc::Sender<SessionInput>,
    access_token: String,
    rng: StdRng,
    last_logged_notice: u64,
}

impl SessionActor {
    #[must_use]
    pub fn new(core: SessionCore, deps: Collaborators, tx: mpsc::Sender<SessionInput>, access_token: String) -> Self {
        Self { core, deps, tx, access_token, rng: StdRng::from_os_rng(), last_logged_notice: 0 }
    }

    /// Replace the random source used for new object ids and placement.
    #[cfg(test)]
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn core(&self) -> &SessionCore {
        &self.core
    }

    /// Sign the core in and kick off presence tracking and the initial load.
    pub fn start(&mut self, identity: Identity) {
        let actions = self.core.sign_in(identity, &now_rfc3339());
        self.execute(actions);
    }

    /// Process inputs until sign-out completes, shutdown is requested, or
    /// every sender is gone. Returns the final core state.
    pub async fn run(mut self, mut rx: mpsc::Receiver<SessionInput>) -> SessionCore {
        let mut ticker = tokio::time::interval(NOTICE_TICK);
        loop {
            tokio::select! {
                input = rx.recv() => {
                    let Some(input) = input else { break };
                    if self.handle(input) == Flow::Stop {
                        break;
                    }
                }
                _ = ticker.tick() => self.core.expire_notices(now_ms()),
            }
        }
        info!("session actor stopped");
        self.core
    }

    /// Apply one input.
    pub fn handle(&mut self, input: SessionInput) -> Flow {
        let flow = match input {
            SessionInput::Command(command) => self.handle_command(command),
            SessionInput::Change(payload) => {
                let applied = self.core.apply_change(&payload, now_ms());
                debug!(?applied, "scene change applied");
                Flow::Continue
            }
            SessionInput::Presence(payload) => {
                self.handle_presence(&payload);
                Flow::Continue
            }
            SessionInput::Completed(completion) => self.handle_completion(completion),
            SessionInput::Shutdown => Flow::Stop,
        };
        self.log_new_notices();
        flow
    }

    // --- Commands ---

    fn handle_command(&mut self, command: SessionCommand) -> Flow {
        let now = now_ms();
        let result = match command {
            SessionCommand::Pointer { input } => self.core.pointer(&input),
            SessionCommand::Add { kind } => self
                .core
                .add_object(kind, &mut self.rng, &now_rfc3339()),
            SessionCommand::ConfirmDelete => self.core.confirm_delete(now),
            SessionCommand::CancelDelete => {
                self.core.cancel_delete();
                Ok(Vec::new())
            }
            SessionCommand::SaveScene { name } => {
                self.core
                    .save_scene(&name, Uuid::new_v4().to_string(), &now_rfc3339())
            }
            SessionCommand::ListSavedScenes => self.core.list_saved_scenes(),
            SessionCommand::LoadSavedScene { id } => self.core.load_saved_scene(&id),
            SessionCommand::DeleteSavedScene { id } => self.core.delete_saved_scene(&id),
            SessionCommand::DismissNotice { id } => {
                self.core.notices.dismiss(id);
                Ok(Vec::new())
            }
            SessionCommand::Status => {
                println!("{}", self.snapshot());
                Ok(Vec::new())
            }
            SessionCommand::SignOut => Ok(self.core.sign_out()),
        };

        match result {
            Ok(actions) => self.execute(actions),
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "command refused");
                self.core
                    .notices
                    .push(NoticeKind::Error, e.to_string(), now);
            }
        }
        Flow::Continue
    }

    /// Apply a presence payload. A join from someone not yet known gets our
    /// own presence re-announced so they learn about us too.
    fn handle_presence(&mut self, payload: &Value) {
        let now = now_rfc3339();
        let greet = self.core.identity().is_some_and(|me| {
            joined_user_ids(payload)
                .into_iter()
                .any(|id| id != me.user_id && self.core.presence.get(id).is_none())
        });
        let applied = self.core.apply_presence(payload, &now);
        debug!(applied, "presence applied");

        if greet {
            if let Some(me) = self.core.identity() {
                let user = me.presence(&now);
                self.dispatch(Action::TrackPresence(user));
            }
        }
    }

    // --- Completions ---

    fn handle_completion(&mut self, completion: Completion) -> Flow {
        let now = now_ms();
        match completion {
            Completion::SceneLoaded(result) => self.core.scene_loaded(result, now),
            Completion::Inserted(result) => self.core.insert_completed(result, now),
            Completion::Written { context, result } => {
                if let Err(e) = result {
                    self.core.write_failed(context, &e, now);
                }
            }
            Completion::SceneSaved(result) => {
                let actions = self.core.scene_saved(result, now);
                self.execute(actions);
            }
            Completion::SavedScenesListed(result) => self.core.saved_scenes_listed(result, now),
            Completion::SceneReplaced(result) => self.core.saved_scene_loaded(result, now),
            Completion::SavedSceneDeleted { id, result } => {
                let actions = self.core.saved_scene_deleted(&id, result, now);
                self.execute(actions);
            }
            Completion::PresencePublished(result) => {
                if let Err(e) = result {
                    warn!(code = e.error_code(), error = %e, "presence publish failed");
                }
            }
            Completion::SessionEnded(result) => {
                if let Err(e) = result {
                    warn!(code = e.error_code(), error = %e, "provider sign-out failed");
                }
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    // --- Actions ---

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            self.dispatch(action);
        }
    }

    fn dispatch(&mut self, action: Action) {
        let repo = Arc::clone(&self.deps.repo);
        match action {
            Action::PersistInsert(record) => self.spawn(async move {
                Completion::Inserted(repo.insert_object(&record).await.map_err(SceneError::from))
            }),
            Action::PersistPosition { id, position } => self.spawn(async move {
                let result = repo
                    .update_position(&id, position)
                    .await
                    .map_err(SceneError::from);
                Completion::Written { context: "Error updating position", result }
            }),
            Action::PersistDelete { id } => self.spawn(async move {
                let result = repo.delete_object(&id).await.map_err(SceneError::from);
                Completion::Written { context: "Error deleting object", result }
            }),
            Action::ConfirmDelete { id } => {
                info!(%id, "delete pending: send confirm_delete or cancel_delete");
            }
            Action::LoadScene => self.spawn(async move {
                Completion::SceneLoaded(repo.list_objects().await.map_err(SceneError::from))
            }),
            Action::TrackPresence(user) => {
                let presence = Arc::clone(&self.deps.presence);
                self.spawn(async move {
                    Completion::PresencePublished(presence.track(&user).await.map_err(SceneError::from))
                });
            }
            Action::UntrackPresence { user_id } => {
                let presence = Arc::clone(&self.deps.presence);
                self.spawn(async move {
                    Completion::PresencePublished(presence.untrack(&user_id).await.map_err(SceneError::from))
                });
            }
            Action::SaveScene(record) => self.spawn(async move {
                Completion::SceneSaved(repo.insert_saved_scene(&record).await.map_err(SceneError::from))
            }),
            Action::ListSavedScenes { owner_id, limit } => self.spawn(async move {
                let result = repo
                    .list_saved_scenes(&owner_id, limit)
                    .await
                    .map(|rows| rows.into_iter().map(SavedScene::from).collect())
                    .map_err(SceneError::from);
                Completion::SavedScenesListed(result)
            }),
            Action::ReplaceRemoteScene { records } => self.spawn(async move {
                Completion::SceneReplaced(repo.replace_objects(&records).await.map_err(SceneError::from))
            }),
            Action::DeleteSavedScene { id } => self.spawn(async move {
                let result = repo.delete_saved_scene(&id).await.map_err(SceneError::from);
                Completion::SavedSceneDeleted { id, result }
            }),
            Action::EndSession => {
                let auth = Arc::clone(&self.deps.auth);
                let token = self.access_token.clone();
                self.spawn(async move { Completion::SessionEnded(auth.sign_out(&token).await) });
            }
        }
    }

    fn spawn<F>(&self, work: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let completion = work.await;
            if tx.send(SessionInput::Completed(completion)).await.is_err() {
                debug!("session closed before completion was delivered");
            }
        });
    }

    // --- Output ---

    /// JSON view of everything a renderer would draw.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let mut presence: Vec<_> = self.core.presence.list();
        presence.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        json!({
            "user": self.core.identity().map(|i| json!({
                "userId": i.user_id,
                "userName": i.user_name,
                "color": i.color,
            })),
            "objects": self.core.scene.objects(),
            "selectedObjectId": self.core.scene.selected(),
            "isDragging": self.core.scene.is_dragging(),
            "pendingDelete": self.core.controller.pending_delete(),
            "presence": presence,
            "savedScenes": self.core.saved_scenes(),
            "notices": self.core.notices.active(),
        })
    }

    fn log_new_notices(&mut self) {
        for notice in self
            .core
            .notices
            .active()
            .iter()
            .filter(|n| n.id > self.last_logged_notice)
        {
            match notice.kind {
                NoticeKind::Error | NoticeKind::Warning => warn!(kind = ?notice.kind, message = %notice.message, "notice"),
                NoticeKind::Success | NoticeKind::Info => info!(kind = ?notice.kind, message = %notice.message, "notice"),
            }
        }
        if let Some(last) = self.core.notices.active().last() {
            self.last_logged_notice = self.last_logged_notice.max(last.id);
        }
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Current time as an RFC 3339 string.
pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
