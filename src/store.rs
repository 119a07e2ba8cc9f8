//! Scene repository — the persistent store behind the shared scene.
//!
//! DESIGN
//! ======
//! Rows cross the boundary as JSON: inserts go through
//! `jsonb_populate_record(set)` and reads come back as `to_jsonb(row)`, so
//! the store shape is defined once by the serde derives on
//! [`ObjectRecord`] and [`SavedSceneRecord`]. The same row encoding is what
//! the change-feed trigger publishes, which keeps echoes and reads identical.
//!
//! `replace_objects` runs its delete-all and bulk insert in one transaction.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use scene::doc::Vec3;
use scene::error::SceneError;
use scene::record::{ObjectRecord, SavedSceneRecord};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, info};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

impl From<StoreError> for SceneError {
    fn from(err: StoreError) -> Self {
        SceneError::Persistence(err.to_string())
    }
}

/// Persistence operations the session issues. Every call is independent;
/// ordering between calls is not guaranteed by the caller.
#[async_trait::async_trait]
pub trait SceneRepository: Send + Sync {
    /// Insert a new object and return the stored row.
    async fn insert_object(&self, record: &ObjectRecord) -> Result<ObjectRecord, StoreError>;

    async fn update_position(&self, id: &str, position: Vec3) -> Result<(), StoreError>;

    async fn delete_object(&self, id: &str) -> Result<(), StoreError>;

    /// Every live object, oldest first.
    async fn list_objects(&self) -> Result<Vec<ObjectRecord>, StoreError>;

    /// Delete every live object, then insert `records`. Returns the stored rows.
    async fn replace_objects(&self, records: &[ObjectRecord]) -> Result<Vec<ObjectRecord>, StoreError>;

    async fn insert_saved_scene(&self, record: &SavedSceneRecord) -> Result<(), StoreError>;

    /// Most recent saved scenes of `owner_id`, newest first.
    async fn list_saved_scenes(&self, owner_id: &str, limit: i64) -> Result<Vec<SavedSceneRecord>, StoreError>;

    async fn delete_saved_scene(&self, id: &str) -> Result<(), StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

/// [`SceneRepository`] over the `scene_objects` and `saved_scenes` tables.
#[derive(Debug, Clone)]
pub struct PgSceneRepository {
    pool: PgPool,
}

impl PgSceneRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SceneRepository for PgSceneRepository {
    async fn insert_object(&self, record: &ObjectRecord) -> Result<ObjectRecord, StoreError> {
        let Json(stored) = sqlx::query_scalar::<_, Json<ObjectRecord>>(
            "INSERT INTO scene_objects
             SELECT * FROM jsonb_populate_record(NULL::scene_objects, $1)
             RETURNING to_jsonb(scene_objects)",
        )
        .bind(Json(record))
        .fetch_one(&self.pool)
        .await?;
        debug!(id = %stored.id, "object inserted");
        Ok(stored)
    }

    async fn update_position(&self, id: &str, position: Vec3) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE scene_objects SET position = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(Json(position))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            debug!(%id, "position write matched no row");
        }
        Ok(())
    }

    async fn delete_object(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM scene_objects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_objects(&self) -> Result<Vec<ObjectRecord>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<ObjectRecord>>(
            "SELECT to_jsonb(o) FROM scene_objects o ORDER BY o.created_at ASC, o.id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }

    async fn replace_objects(&self, records: &[ObjectRecord]) -> Result<Vec<ObjectRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM scene_objects")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let rows = sqlx::query_scalar::<_, Json<ObjectRecord>>(
            "INSERT INTO scene_objects
             SELECT * FROM jsonb_populate_recordset(NULL::scene_objects, $1)
             RETURNING to_jsonb(scene_objects)",
        )
        .bind(Json(records))
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        info!(deleted, inserted = rows.len(), "scene replaced");
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }

    async fn insert_saved_scene(&self, record: &SavedSceneRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO saved_scenes
             SELECT * FROM jsonb_populate_record(NULL::saved_scenes, $1)",
        )
        .bind(Json(record))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_saved_scenes(&self, owner_id: &str, limit: i64) -> Result<Vec<SavedSceneRecord>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<SavedSceneRecord>>(
            "SELECT to_jsonb(s) FROM saved_scenes s
             WHERE s.user_id = $1
             ORDER BY s.created_at DESC
             LIMIT $2",
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }

    async fn delete_saved_scene(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM saved_scenes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("saved scene {id}")));
        }
        Ok(())
    }
}
