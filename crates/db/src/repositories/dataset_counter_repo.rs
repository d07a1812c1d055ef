//! Repository for the `task_dataset_counters` table.
//!
//! Counter writes are optimistic: callers read a row, compute the new state
//! and write it back only if `version` is unchanged.

use geti_core::dataset_counter::DatasetCounterState;
use geti_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::dataset_counter::TaskDatasetCounter;

const COLUMNS: &str = "task_id, project_id, dataset_size, label_counts, counted_items, \
     dynamic_required_annotations, version, updated_at";

/// Provides per-task dataset counter persistence.
pub struct DatasetCounterRepo;

impl DatasetCounterRepo {
    /// Fetch the counter of a task, creating an empty one on first use.
    pub async fn get_or_init(
        pool: &PgPool,
        project_id: DbId,
        task_id: DbId,
    ) -> Result<TaskDatasetCounter, sqlx::Error> {
        sqlx::query(
            "INSERT INTO task_dataset_counters (task_id, project_id) VALUES ($1, $2)
             ON CONFLICT (task_id) DO NOTHING",
        )
        .bind(task_id)
        .bind(project_id)
        .execute(pool)
        .await?;

        let query = format!("SELECT {COLUMNS} FROM task_dataset_counters WHERE task_id = $1");
        sqlx::query_as::<_, TaskDatasetCounter>(&query)
            .bind(task_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_task(
        pool: &PgPool,
        task_id: DbId,
    ) -> Result<Option<TaskDatasetCounter>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_dataset_counters WHERE task_id = $1");
        sqlx::query_as::<_, TaskDatasetCounter>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// Write `state` if the row is still at `expected_version`.
    ///
    /// Returns `None` when another writer got there first.
    pub async fn compare_and_swap(
        pool: &PgPool,
        task_id: DbId,
        expected_version: i64,
        state: &DatasetCounterState,
    ) -> Result<Option<TaskDatasetCounter>, sqlx::Error> {
        let query = format!(
            "UPDATE task_dataset_counters SET
                dataset_size = $3,
                label_counts = $4,
                counted_items = $5,
                version = version + 1,
                updated_at = NOW()
             WHERE task_id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskDatasetCounter>(&query)
            .bind(task_id)
            .bind(expected_version)
            .bind(state.dataset_size)
            .bind(Json(&state.label_counts))
            .bind(Json(&state.counted_items))
            .fetch_optional(pool)
            .await
    }

    /// Store (or clear) the dynamic required annotations of a task.
    ///
    /// Bumps `version`, so an in-flight counter update retries.
    pub async fn set_dynamic_required_annotations(
        pool: &PgPool,
        task_id: DbId,
        required: Option<i64>,
    ) -> Result<Option<TaskDatasetCounter>, sqlx::Error> {
        let query = format!(
            "UPDATE task_dataset_counters SET
                dynamic_required_annotations = $2,
                version = version + 1,
                updated_at = NOW()
             WHERE task_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskDatasetCounter>(&query)
            .bind(task_id)
            .bind(required)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete_by_task(pool: &PgPool, task_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_dataset_counters WHERE task_id = $1")
            .bind(task_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
