//! Input model: pointer events and the gesture state machine.
//!
//! `PointerInput` is what the host forwards from the renderer's hit-testing
//! (the object under the pointer and the world-space hit point). `Gesture` is
//! the active press being tracked between pointer-down and pointer-up,
//! carrying the context needed to tell a click from a drag and to keep the
//! grab offset stable while moving.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::doc::{ObjectId, Vec3};

/// A pointer event already resolved against the scene by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerInput {
    /// Press on an object at a world-space hit point.
    Down { id: ObjectId, hit: Vec3 },
    /// Pointer moved; `hit` is the new world-space point under the pointer.
    Move { hit: Vec3 },
    /// Release anywhere, including outside the object or the viewport.
    Up,
    /// Click on empty space.
    BackgroundClick,
    /// Double-click on an object.
    DoubleClick { id: ObjectId },
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// No press in progress.
    #[default]
    Idle,
    /// Pointer is down on an object but has not travelled past the drag threshold.
    Pressed {
        /// Object under the pointer at press time.
        id: ObjectId,
        /// World-space hit point at press time.
        start: Vec3,
        /// Hit point minus object position, kept constant through the drag.
        offset: Vec3,
    },
    /// The object is following the pointer.
    Dragging {
        /// Object being dragged.
        id: ObjectId,
        /// Grab offset carried over from the press.
        offset: Vec3,
    },
}

impl Gesture {
    /// Id of the object the gesture is acting on, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Pressed { id, .. } | Self::Dragging { id, .. } => Some(id),
        }
    }
}

/// Component-wise `a - b`.
#[must_use]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    let [dx, dy, dz] = sub(a, b);
    (dx * dx + dy * dy + dz * dz).sqrt()
}
