//! Interaction controller: pointer intents to optimistic edits and actions.
//!
//! DESIGN
//! ======
//! Every intent mutates the injected [`SceneStore`] first so the renderer
//! sees the result immediately, then returns the persistence work as
//! [`Action`]s for the host. A drag updates the store on every move but
//! persists once, on release. Failed writes are never rolled back; the host
//! reports them and the next echo or write wins.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use rand::Rng;
use tracing::debug;

use crate::consts::{DRAG_THRESHOLD, MIN_DRAG_HEIGHT, SPAWN_HEIGHT, SPAWN_SQUARE};
use crate::doc::{ObjectId, ObjectKind, PartialSceneObject, SceneStore, Vec3};
use crate::input::{Gesture, distance, sub};
use crate::record::ObjectRecord;
use crate::session::{Action, Identity};

/// Gesture tracking plus the delete-confirmation overlay.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    gesture: Gesture,
    pending_delete: Option<ObjectId>,
}

impl InteractionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Queries ---

    /// The gesture currently being tracked.
    #[must_use]
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Object awaiting delete confirmation, if the prompt is open.
    #[must_use]
    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Forget any gesture and close the prompt.
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
        self.pending_delete = None;
    }

    // --- Pointer ---

    /// Press on an object. Records the press; nothing is mutated yet.
    pub fn on_pointer_down(&mut self, scene: &SceneStore, id: &str, hit: Vec3) -> Vec<Action> {
        let Some(obj) = scene.get(id) else {
            debug!(%id, "pointer down on unknown object ignored");
            return Vec::new();
        };
        self.gesture = Gesture::Pressed { id: obj.id.clone(), start: hit, offset: sub(hit, obj.position) };
        Vec::new()
    }

    /// Pointer motion. Crossing the threshold starts a drag and raises the
    /// drag gate; every later move writes the new position to the store.
    pub fn on_pointer_move(&mut self, scene: &mut SceneStore, hit: Vec3) -> Vec<Action> {
        let next = match &self.gesture {
            Gesture::Idle => None,
            Gesture::Pressed { id, start, offset } => {
                if distance(*start, hit) > DRAG_THRESHOLD {
                    Some(Gesture::Dragging { id: id.clone(), offset: *offset })
                } else {
                    None
                }
            }
            Gesture::Dragging { id, offset } => {
                let mut position = sub(hit, *offset);
                position[1] = position[1].max(MIN_DRAG_HEIGHT);
                if !scene.update(id, &PartialSceneObject::position(position)) {
                    debug!(%id, "dragged object no longer in scene");
                }
                None
            }
        };

        if let Some(dragging) = next {
            scene.set_dragging(true);
            self.gesture = dragging;
        }
        Vec::new()
    }

    /// Release. Ends a drag with exactly one position write, or treats a
    /// press that never moved as a click and selects the object.
    pub fn on_pointer_up(&mut self, scene: &mut SceneStore) -> Vec<Action> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Vec::new(),
            Gesture::Pressed { id, .. } => {
                scene.select(Some(id.as_str()));
                Vec::new()
            }
            Gesture::Dragging { id, .. } => {
                scene.set_dragging(false);
                match scene.get(&id) {
                    Some(obj) => vec![Action::PersistPosition { id, position: obj.position }],
                    None => {
                        debug!(%id, "drag ended on removed object; nothing to persist");
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Click on empty space clears the selection.
    pub fn on_background_click(&mut self, scene: &mut SceneStore) -> Vec<Action> {
        if self.gesture == Gesture::Idle {
            scene.select(None);
        }
        Vec::new()
    }

    // --- Delete ---

    /// Double-click opens the delete confirmation for `id`.
    pub fn on_double_click(&mut self, scene: &SceneStore, id: &str) -> Vec<Action> {
        if !scene.contains(id) {
            return Vec::new();
        }
        self.pending_delete = Some(id.to_owned());
        vec![Action::ConfirmDelete { id: id.to_owned() }]
    }

    /// Confirm the open prompt: remove locally and request the delete.
    pub fn confirm_delete(&mut self, scene: &mut SceneStore) -> Vec<Action> {
        let Some(id) = self.pending_delete.take() else {
            return Vec::new();
        };
        if self.gesture.target() == Some(id.as_str()) {
            self.gesture = Gesture::Idle;
            scene.set_dragging(false);
        }
        scene.remove(&id);
        vec![Action::PersistDelete { id }]
    }

    /// Dismiss the prompt without touching the scene.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    // --- Add ---

    /// Build a new object for `identity` at a random spot in the spawn square
    /// and request its insert. The store is only updated once the canonical
    /// row comes back.
    pub fn add_object<R: Rng + ?Sized>(
        &self,
        kind: ObjectKind,
        identity: &Identity,
        rng: &mut R,
        created_at: &str,
    ) -> Vec<Action> {
        let id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
        let x = (rng.random::<f64>() - 0.5) * SPAWN_SQUARE;
        let z = (rng.random::<f64>() - 0.5) * SPAWN_SQUARE;
        let record = ObjectRecord {
            id: id.to_string(),
            kind,
            position: [x, SPAWN_HEIGHT, z],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
            color: identity.color.clone(),
            user_id: identity.user_id.clone(),
            user_name: identity.user_name.clone(),
            created_at: created_at.to_owned(),
            updated_at: None,
        };
        vec![Action::PersistInsert(record)]
    }
}
