//! Shared numeric constants for the scene crate.

// ── Interaction ─────────────────────────────────────────────────

/// Pointer travel in scene units before a press on an object becomes a drag.
pub const DRAG_THRESHOLD: f64 = 0.1;

/// Lowest height a dragged object may reach; keeps objects above the ground plane.
pub const MIN_DRAG_HEIGHT: f64 = 0.0;

// ── Spawning ────────────────────────────────────────────────────

/// Side length of the square, centered on the origin, where new objects land.
pub const SPAWN_SQUARE: f64 = 5.0;

/// Initial height of newly added objects.
pub const SPAWN_HEIGHT: f64 = 1.0;

// ── Presence ────────────────────────────────────────────────────

/// Color used when a presence payload carries none.
pub const DEFAULT_PRESENCE_COLOR: &str = "#3b82f6";

/// Display name used when neither a presence payload nor an account carries one.
pub const DEFAULT_USER_NAME: &str = "User";

// ── Reconciliation ──────────────────────────────────────────────

/// How long a locally deleted id keeps rejecting late insert echoes.
pub const DEFAULT_TOMBSTONE_TTL_MS: i64 = 30_000;

// ── Notices & saved scenes ──────────────────────────────────────

/// Lifetime of a notice before it is auto-dismissed.
pub const DEFAULT_NOTICE_DURATION_MS: i64 = 3_000;

/// Number of most recent saved scenes fetched for the load list.
pub const SAVED_SCENE_LIST_LIMIT: i64 = 10;
