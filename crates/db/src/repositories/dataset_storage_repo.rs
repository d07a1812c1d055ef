//! Repository for the `dataset_storages` table.

use geti_core::types::DbId;
use sqlx::PgPool;

use crate::models::dataset_storage::{CreateDatasetStorage, DatasetStorage};

const COLUMNS: &str = "id, project_id, name, use_for_training, created_at";

/// Provides CRUD operations for dataset storages.
pub struct DatasetStorageRepo;

impl DatasetStorageRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateDatasetStorage,
    ) -> Result<DatasetStorage, sqlx::Error> {
        let query = format!(
            "INSERT INTO dataset_storages (project_id, name, use_for_training)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DatasetStorage>(&query)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(input.use_for_training)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DatasetStorage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dataset_storages WHERE id = $1");
        sqlx::query_as::<_, DatasetStorage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a dataset storage together with its media and annotation
    /// scene states.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dataset_storages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
