//! Repositories for the `model_storages` and `models` tables.

use geti_core::types::DbId;
use sqlx::PgPool;

use crate::models::model::{
    CreateModel, CreateModelStorage, Model, ModelPerformanceRow, ModelStorage,
};

// ---------------------------------------------------------------------------
// Model storage
// ---------------------------------------------------------------------------

const STORAGE_COLUMNS: &str =
    "id, project_id, task_id, model_template_id, hyper_parameters, created_at";

/// Provides CRUD operations for model storages.
pub struct ModelStorageRepo;

impl ModelStorageRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateModelStorage,
    ) -> Result<ModelStorage, sqlx::Error> {
        let query = format!(
            "INSERT INTO model_storages (project_id, task_id, model_template_id, hyper_parameters)
             VALUES ($1, $2, $3, $4)
             RETURNING {STORAGE_COLUMNS}"
        );
        sqlx::query_as::<_, ModelStorage>(&query)
            .bind(input.project_id)
            .bind(input.task_id)
            .bind(&input.model_template_id)
            .bind(&input.hyper_parameters)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ModelStorage>, sqlx::Error> {
        let query = format!("SELECT {STORAGE_COLUMNS} FROM model_storages WHERE id = $1");
        sqlx::query_as::<_, ModelStorage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a model storage with its models and hyper parameter records.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM model_storages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

const MODEL_COLUMNS: &str =
    "m.id, m.model_storage_id, m.performance, m.training_dataset_size, m.created_at";

/// Provides operations on trained models.
pub struct ModelRepo;

impl ModelRepo {
    pub async fn create(pool: &PgPool, input: &CreateModel) -> Result<Model, sqlx::Error> {
        let query = format!(
            "INSERT INTO models AS m (model_storage_id, performance, training_dataset_size)
             VALUES ($1, $2, $3)
             RETURNING {MODEL_COLUMNS}"
        );
        sqlx::query_as::<_, Model>(&query)
            .bind(input.model_storage_id)
            .bind(input.performance)
            .bind(input.training_dataset_size)
            .fetch_one(pool)
            .await
    }

    /// Most recently trained model across all model storages of a task.
    pub async fn get_latest_model_for_task(
        pool: &PgPool,
        task_id: DbId,
    ) -> Result<Option<Model>, sqlx::Error> {
        let query = format!(
            "SELECT {MODEL_COLUMNS}
             FROM models m
             JOIN model_storages ms ON ms.id = m.model_storage_id
             WHERE ms.task_id = $1
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Model>(&query)
            .bind(task_id)
            .fetch_optional(pool)
            .await
    }

    /// A model of the task by id; `None` when it belongs to another task.
    pub async fn find_for_task(
        pool: &PgPool,
        task_id: DbId,
        model_id: DbId,
    ) -> Result<Option<Model>, sqlx::Error> {
        let query = format!(
            "SELECT {MODEL_COLUMNS}
             FROM models m
             JOIN model_storages ms ON ms.id = m.model_storage_id
             WHERE ms.task_id = $1 AND m.id = $2"
        );
        sqlx::query_as::<_, Model>(&query)
            .bind(task_id)
            .bind(model_id)
            .fetch_optional(pool)
            .await
    }

    /// Performance of each of the given models. Unknown ids are omitted.
    pub async fn get_performance_by_model_ids(
        pool: &PgPool,
        model_ids: &[DbId],
    ) -> Result<Vec<ModelPerformanceRow>, sqlx::Error> {
        sqlx::query_as::<_, ModelPerformanceRow>(
            "SELECT id, performance FROM models WHERE id = ANY($1) ORDER BY id",
        )
        .bind(model_ids)
        .fetch_all(pool)
        .await
    }

    /// Number of trained models of a task.
    pub async fn count_for_task(pool: &PgPool, task_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM models m
             JOIN model_storages ms ON ms.id = m.model_storage_id
             WHERE ms.task_id = $1",
        )
        .bind(task_id)
        .fetch_one(pool)
        .await
    }
}
