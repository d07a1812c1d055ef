//! Keeps the stored dynamic annotation requirement of each task in line
//! with its latest model.

use geti_core::dynamic_required_annotations::dynamic_required_annotations;
use geti_core::error::CoreError;
use geti_core::types::DbId;
use geti_db::models::model::Model;
use geti_db::models::task::Task;
use geti_db::repositories::{ConfigurableParametersRepo, DatasetCounterRepo, ModelRepo};
use sqlx::PgPool;

use crate::error::WorkerError;

#[derive(Debug, Clone)]
pub struct DynamicRequiredAnnotations {
    pool: PgPool,
}

impl DynamicRequiredAnnotations {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recompute and store the requirement from the task's latest model.
    ///
    /// Without a model, or with a model that has no recorded performance,
    /// the stored value is cleared and the configured static requirement
    /// applies again. Returns the stored value.
    pub async fn update_for_task(
        &self,
        workspace_id: DbId,
        task: &Task,
    ) -> Result<Option<i64>, WorkerError> {
        let latest = ModelRepo::get_latest_model_for_task(&self.pool, task.id).await?;
        self.store(workspace_id, task, latest.as_ref()).await
    }

    /// Recompute and store the requirement from the model that just became
    /// the task's active model.
    pub async fn update_for_active_model(
        &self,
        workspace_id: DbId,
        task: &Task,
        model_id: DbId,
    ) -> Result<Option<i64>, WorkerError> {
        let model = ModelRepo::find_for_task(&self.pool, task.id, model_id)
            .await?
            .ok_or(WorkerError::Core(CoreError::NotFound {
                entity: "model",
                id: model_id,
            }))?;
        self.store(workspace_id, task, Some(&model)).await
    }

    async fn store(
        &self,
        workspace_id: DbId,
        task: &Task,
        model: Option<&Model>,
    ) -> Result<Option<i64>, WorkerError> {
        let config = ConfigurableParametersRepo::new(&self.pool, workspace_id, task.project_id)
            .get_dataset_counter_config(task)
            .await?;
        let required = dynamic_required_annotations(
            model.map(|m| m.model_performance()),
            config.required_images_auto_training,
        );

        DatasetCounterRepo::get_or_init(&self.pool, task.project_id, task.id).await?;
        DatasetCounterRepo::set_dynamic_required_annotations(&self.pool, task.id, required).await?;

        tracing::info!(
            task_id = task.id,
            model_id = ?model.map(|m| m.id),
            performance = ?model.and_then(|m| m.performance),
            required = ?required,
            "Dynamic required annotations updated"
        );
        Ok(required)
    }
}
