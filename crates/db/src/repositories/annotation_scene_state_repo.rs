//! Repository for the `annotation_scene_states` table.

use geti_core::annotation_state::{AnnotationSceneState, AnnotationState, MediaIdentifier};
use geti_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::DbError;
use crate::models::annotation_scene_state::{AnnotationSceneStateRow, AnnotationStateCounts};

const COLUMNS: &str = "id, dataset_storage_id, media_id, frame_index, annotation_scene_id, \
     state_per_task, unannotated_rois, created_at";

/// Newest first; the id breaks ties between rows of one transaction.
const LATEST_FIRST: &str = "ORDER BY created_at DESC, id DESC";

/// Provides the annotation scene state history of media.
pub struct AnnotationSceneStateRepo;

impl AnnotationSceneStateRepo {
    /// Record a new state for the media of `state`.
    ///
    /// The transition from the media's current state is checked first:
    /// returning to `NONE` for a task requires `annotations_deleted`.
    pub async fn save(
        pool: &PgPool,
        dataset_storage_id: DbId,
        state: &AnnotationSceneState,
        annotations_deleted: bool,
    ) -> Result<AnnotationSceneStateRow, DbError> {
        let previous =
            Self::get_latest_for_media(pool, dataset_storage_id, &state.media_identifier).await?;
        state.validate_transition(previous.map(|p| p.to_state()).as_ref(), annotations_deleted)?;

        let query = format!(
            "INSERT INTO annotation_scene_states
                (dataset_storage_id, media_id, frame_index, annotation_scene_id,
                 state_per_task, unannotated_rois)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AnnotationSceneStateRow>(&query)
            .bind(dataset_storage_id)
            .bind(state.media_identifier.media_id)
            .bind(state.media_identifier.frame_index)
            .bind(state.annotation_scene_id)
            .bind(Json(&state.state_per_task))
            .bind(Json(&state.unannotated_rois))
            .fetch_one(pool)
            .await?;
        Ok(row)
    }

    /// Latest state recorded for an annotation scene.
    pub async fn get_latest_for_annotation_scene(
        pool: &PgPool,
        annotation_scene_id: DbId,
    ) -> Result<Option<AnnotationSceneStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_scene_states
             WHERE annotation_scene_id = $1
             {LATEST_FIRST} LIMIT 1"
        );
        sqlx::query_as::<_, AnnotationSceneStateRow>(&query)
            .bind(annotation_scene_id)
            .fetch_optional(pool)
            .await
    }

    /// Latest state of an image or video frame, across annotation scenes.
    pub async fn get_latest_for_media(
        pool: &PgPool,
        dataset_storage_id: DbId,
        media: &MediaIdentifier,
    ) -> Result<Option<AnnotationSceneStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_scene_states
             WHERE dataset_storage_id = $1
               AND media_id = $2
               AND frame_index IS NOT DISTINCT FROM $3
             {LATEST_FIRST} LIMIT 1"
        );
        sqlx::query_as::<_, AnnotationSceneStateRow>(&query)
            .bind(dataset_storage_id)
            .bind(media.media_id)
            .bind(media.frame_index)
            .fetch_optional(pool)
            .await
    }

    /// Full history of a media, newest first. Includes every frame of a
    /// video.
    pub async fn list_history_for_media(
        pool: &PgPool,
        media_id: DbId,
    ) -> Result<Vec<AnnotationSceneStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotation_scene_states
             WHERE media_id = $1
             {LATEST_FIRST}"
        );
        sqlx::query_as::<_, AnnotationSceneStateRow>(&query)
            .bind(media_id)
            .fetch_all(pool)
            .await
    }

    /// Count media of a dataset storage by their latest state for `task_id`.
    /// Media whose latest state has no entry for the task count as `NONE`.
    pub async fn count_media_by_state_for_task(
        pool: &PgPool,
        dataset_storage_id: DbId,
        task_id: DbId,
    ) -> Result<AnnotationStateCounts, DbError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT COALESCE(latest.state_per_task ->> $2, 'none') AS state, COUNT(*)
             FROM (
                 SELECT DISTINCT ON (media_id, frame_index) state_per_task
                 FROM annotation_scene_states
                 WHERE dataset_storage_id = $1
                 ORDER BY media_id, frame_index, created_at DESC, id DESC
             ) latest
             GROUP BY 1",
        )
        .bind(dataset_storage_id)
        .bind(task_id.to_string())
        .fetch_all(pool)
        .await?;

        let mut counts = AnnotationStateCounts::default();
        for (state, count) in rows {
            match AnnotationState::from_str_value(&state)? {
                AnnotationState::None => counts.none += count,
                AnnotationState::PartiallyAnnotated => counts.partially_annotated += count,
                AnnotationState::Annotated => counts.annotated += count,
            }
        }
        Ok(counts)
    }

    /// Delete the whole history of a media. Returns the number of rows
    /// removed.
    pub async fn delete_all_by_media(pool: &PgPool, media_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM annotation_scene_states WHERE media_id = $1")
            .bind(media_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_by_dataset_storage(
        pool: &PgPool,
        dataset_storage_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM annotation_scene_states WHERE dataset_storage_id = $1")
                .bind(dataset_storage_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
