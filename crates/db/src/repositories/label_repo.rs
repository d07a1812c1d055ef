//! Repository for the `labels`, `label_schemas` and `label_schema_labels`
//! tables.

use geti_core::types::DbId;
use sqlx::PgPool;

use crate::models::label::{CreateLabel, Label, LabelSchema};

const COLUMNS: &str = "id, project_id, name, is_empty, created_at";

/// Same columns, qualified for joins.
const JOINED_COLUMNS: &str = "l.id, l.project_id, l.name, l.is_empty, l.created_at";

/// Provides label and per-task label schema operations.
pub struct LabelRepo;

impl LabelRepo {
    pub async fn create(pool: &PgPool, input: &CreateLabel) -> Result<Label, sqlx::Error> {
        let query = format!(
            "INSERT INTO labels (project_id, name, is_empty)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Label>(&query)
            .bind(input.project_id)
            .bind(&input.name)
            .bind(input.is_empty)
            .fetch_one(pool)
            .await
    }

    /// Insert a new label schema version for a task. The new schema becomes
    /// the task's current one.
    pub async fn create_schema(
        pool: &PgPool,
        task_id: DbId,
        label_ids: &[DbId],
    ) -> Result<LabelSchema, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let schema = sqlx::query_as::<_, LabelSchema>(
            "INSERT INTO label_schemas (task_id) VALUES ($1) RETURNING id, task_id, created_at",
        )
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        for &label_id in label_ids {
            sqlx::query(
                "INSERT INTO label_schema_labels (label_schema_id, label_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(schema.id)
            .bind(label_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(schema)
    }

    /// Labels of the task's most recent schema, ordered by id.
    ///
    /// Returns an empty list when the task has no schema yet.
    pub async fn get_latest_labels_for_task(
        pool: &PgPool,
        task_id: DbId,
        include_empty: bool,
    ) -> Result<Vec<Label>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS}
             FROM labels l
             JOIN label_schema_labels sl ON sl.label_id = l.id
             WHERE sl.label_schema_id = (
                 SELECT id FROM label_schemas WHERE task_id = $1
                 ORDER BY created_at DESC, id DESC LIMIT 1
             )
             AND ($2 OR NOT l.is_empty)
             ORDER BY l.id"
        );
        sqlx::query_as::<_, Label>(&query)
            .bind(task_id)
            .bind(include_empty)
            .fetch_all(pool)
            .await
    }
}
