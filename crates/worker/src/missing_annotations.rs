//! Missing-annotations report of a task, derived from its current state.

use geti_core::dataset_counter::{
    compute_missing_annotations, MissingAnnotationsInput, MissingAnnotationsReport, TaskLabel,
};
use geti_core::types::DbId;
use geti_db::models::task::Task;
use geti_db::repositories::{
    ConfigurableParametersRepo, DatasetCounterRepo, LabelRepo, ModelRepo, TaskRepo,
};
use sqlx::PgPool;

use crate::error::WorkerError;

#[derive(Debug, Clone)]
pub struct MissingAnnotationsHelper {
    pool: PgPool,
}

impl MissingAnnotationsHelper {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// How many annotations the task still needs for manual and automatic
    /// training. A task without any model is a normal state, not an error.
    pub async fn get_missing_annotations_for_task(
        &self,
        workspace_id: DbId,
        task: &Task,
    ) -> Result<MissingAnnotationsReport, WorkerError> {
        let config = ConfigurableParametersRepo::new(&self.pool, workspace_id, task.project_id)
            .get_dataset_counter_config(task)
            .await?;
        let counter = DatasetCounterRepo::get_or_init(&self.pool, task.project_id, task.id).await?;
        let labels: Vec<TaskLabel> =
            LabelRepo::get_latest_labels_for_task(&self.pool, task.id, false)
                .await?
                .iter()
                .map(|l| l.to_task_label())
                .collect();
        let has_trained_model = ModelRepo::count_for_task(&self.pool, task.id).await? > 0;

        let state = counter.state();
        Ok(compute_missing_annotations(MissingAnnotationsInput {
            config: &config,
            counters: &state,
            labels: &labels,
            has_trained_model,
            dynamic_required_annotations: counter.dynamic_required_annotations,
        }))
    }

    /// Reports of every task of a project, in pipeline order.
    pub async fn get_missing_annotations_for_project(
        &self,
        workspace_id: DbId,
        project_id: DbId,
    ) -> Result<Vec<(DbId, MissingAnnotationsReport)>, WorkerError> {
        let tasks = TaskRepo::list_by_project(&self.pool, project_id).await?;
        let mut reports = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let report = self.get_missing_annotations_for_task(workspace_id, task).await?;
            reports.push((task.id, report));
        }
        Ok(reports)
    }
}
