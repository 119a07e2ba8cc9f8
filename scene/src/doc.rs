//! Document model: scene objects, sparse updates, and the in-memory store.
//!
//! This module defines what is placed in the shared scene (`SceneObject`,
//! `ObjectKind`), a sparse-update type for incremental edits
//! (`PartialSceneObject`), and the runtime store that owns every live object
//! together with the current selection and drag gate (`SceneStore`).
//!
//! Data flows into this layer from the reconciler (remote changes) and from
//! the interaction controller (optimistic local edits). The renderer reads
//! from `SceneStore::objects` in arrival order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};

/// Opaque, client-generated identifier for a scene object.
pub type ObjectId = String;

/// A three-component vector in scene units.
pub type Vec3 = [f64; 3];

/// The kind of a placed primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Unit cube.
    Cube,
    /// Sphere.
    Sphere,
}

/// A placed primitive as held in the live scene (view shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    /// Unique identifier, assigned at creation and never changed.
    pub id: ObjectId,
    /// Primitive type; immutable after creation.
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Center of the object in scene coordinates.
    pub position: Vec3,
    /// Euler rotation in radians.
    pub rotation: Vec3,
    /// Per-axis scale factor.
    pub scale: Vec3,
    /// Display color, fixed to the creator's assigned color.
    pub color: String,
    /// User who created the object.
    #[serde(rename = "userId")]
    pub owner_id: String,
    /// Display name of the creating user.
    #[serde(rename = "userName")]
    pub owner_name: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

/// Sparse update for a scene object. Only present fields are applied, and
/// only mutable fields exist here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialSceneObject {
    /// New position, if being updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    /// New rotation, if being updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vec3>,
    /// New scale, if being updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec3>,
    /// New color, if being updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl PartialSceneObject {
    /// A patch that moves an object and touches nothing else.
    #[must_use]
    pub fn position(position: Vec3) -> Self {
        Self { position: Some(position), ..Self::default() }
    }

    /// Whether the patch carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.rotation.is_none() && self.scale.is_none() && self.color.is_none()
    }
}

/// In-memory store of the live scene plus selection and drag state.
///
/// Invariants: ids are unique, and `selected` always names a live object.
#[derive(Debug, Clone, Default)]
pub struct SceneStore {
    objects: Vec<SceneObject>,
    selected: Option<ObjectId>,
    dragging: bool,
}

impl SceneStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. An existing object with the same `id` is overwritten in
    /// place. Returns `true` when a new entry was appended.
    pub fn add(&mut self, obj: SceneObject) -> bool {
        if let Some(existing) = self.objects.iter_mut().find(|o| o.id == obj.id) {
            *existing = obj;
            return false;
        }
        self.objects.push(obj);
        true
    }

    /// Apply a partial update. Returns `false` if the object doesn't exist.
    pub fn update(&mut self, id: &str, partial: &PartialSceneObject) -> bool {
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        if let Some(position) = partial.position {
            obj.position = position;
        }
        if let Some(rotation) = partial.rotation {
            obj.rotation = rotation;
        }
        if let Some(scale) = partial.scale {
            obj.scale = scale;
        }
        if let Some(ref color) = partial.color {
            obj.color.clone_from(color);
        }
        true
    }

    /// Remove an object by id, returning it if it was present. Clears the
    /// selection when it pointed at the removed object.
    pub fn remove(&mut self, id: &str) -> Option<SceneObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Some(self.objects.remove(index))
    }

    /// Replace all objects with a full snapshot.
    ///
    /// Duplicate ids collapse to one entry holding the last value. Selection
    /// survives only if it still names a live object; the drag gate is left
    /// for the caller.
    pub fn replace_all(&mut self, objects: Vec<SceneObject>) {
        self.objects.clear();
        for obj in objects {
            self.add(obj);
        }
        if self.selected.as_deref().is_some_and(|id| !self.contains(id)) {
            self.selected = None;
        }
    }

    /// Select an object, or clear the selection with `None`. Selecting an
    /// unknown id is refused and returns `false`.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if !self.contains(id) => false,
            Some(id) => {
                self.selected = Some(id.to_owned());
                true
            }
            None => {
                self.selected = None;
                true
            }
        }
    }

    /// Set the drag gate that suspends camera controls.
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Drop every object and reset selection and drag state.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.selected = None;
        self.dragging = false;
    }

    /// All live objects in arrival order.
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Return a reference to an object by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Whether an object with this id is live.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.objects.iter().any(|o| o.id == id)
    }

    /// The currently selected object id, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Whether an object drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the scene holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
