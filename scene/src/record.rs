//! Store-shape records and the view/record format adapter.
//!
//! DESIGN
//! ======
//! The persistent store speaks snake_case rows (`user_id`, `created_at`);
//! the live scene speaks the view shape in [`crate::doc`]. Conversion is a
//! pure field rename in both directions and performs no validation, so a
//! malformed row must be rejected while deserializing, never coerced here.

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;

use serde::{Deserialize, Serialize};

use crate::doc::{ObjectKind, SceneObject, Vec3};
use crate::error::SceneError;

/// A scene object as stored in the `scene_objects` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub color: String,
    pub user_id: String,
    pub user_name: String,
    pub created_at: String,
    /// Server-maintained modification time; not part of the view shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ObjectRecord {
    /// Deserialize a raw stream or query row.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::StreamDelivery`] when the value is not a complete record.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SceneError> {
        serde_json::from_value(value.clone()).map_err(|e| SceneError::StreamDelivery(format!("object record: {e}")))
    }
}

/// Convert a stored record into the live view shape.
#[must_use]
pub fn to_view(record: ObjectRecord) -> SceneObject {
    SceneObject {
        id: record.id,
        kind: record.kind,
        position: record.position,
        rotation: record.rotation,
        scale: record.scale,
        color: record.color,
        owner_id: record.user_id,
        owner_name: record.user_name,
        created_at: record.created_at,
    }
}

/// Convert a live object into the stored record shape.
#[must_use]
pub fn to_record(obj: &SceneObject) -> ObjectRecord {
    ObjectRecord {
        id: obj.id.clone(),
        kind: obj.kind,
        position: obj.position,
        rotation: obj.rotation,
        scale: obj.scale,
        color: obj.color.clone(),
        user_id: obj.owner_id.clone(),
        user_name: obj.owner_name.clone(),
        created_at: obj.created_at.clone(),
        updated_at: None,
    }
}

impl From<ObjectRecord> for SceneObject {
    fn from(record: ObjectRecord) -> Self {
        to_view(record)
    }
}

impl From<&SceneObject> for ObjectRecord {
    fn from(obj: &SceneObject) -> Self {
        to_record(obj)
    }
}

/// A named snapshot as stored in the `saved_scenes` table.
///
/// `scene_data` holds the objects in view shape, exactly as they were live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSceneRecord {
    pub id: String,
    pub name: String,
    pub scene_data: Vec<SceneObject>,
    pub user_id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A saved snapshot of the live scene, independent of it once taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedScene {
    pub id: String,
    pub name: String,
    pub objects: Vec<SceneObject>,
    pub owner_id: String,
    pub created_at: String,
}

impl From<SavedSceneRecord> for SavedScene {
    fn from(record: SavedSceneRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            objects: record.scene_data,
            owner_id: record.user_id,
            created_at: record.created_at,
        }
    }
}

impl From<&SavedScene> for SavedSceneRecord {
    fn from(scene: &SavedScene) -> Self {
        Self {
            id: scene.id.clone(),
            name: scene.name.clone(),
            scene_data: scene.objects.clone(),
            user_id: scene.owner_id.clone(),
            created_at: scene.created_at.clone(),
            updated_at: None,
        }
    }
}
