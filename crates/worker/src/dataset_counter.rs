//! Incremental per-task dataset counters.
//!
//! Every update reads the counter row, applies the change in memory and
//! writes it back with a compare-and-swap on the row version. Losing a
//! concurrent write triggers a bounded number of retries.

use geti_core::dataset_counter::{DatasetCounterState, DatasetUpdate};
use geti_core::error::CoreError;
use geti_db::models::dataset_counter::TaskDatasetCounter;
use geti_db::models::task::Task;
use geti_db::repositories::{DatasetCounterRepo, LabelRepo};
use sqlx::PgPool;

use crate::error::WorkerError;

#[derive(Debug, Clone)]
pub struct DatasetCounterService {
    pool: PgPool,
    max_retries: u32,
}

impl DatasetCounterService {
    pub fn new(pool: PgPool, max_retries: u32) -> Self {
        Self { pool, max_retries }
    }

    /// Apply one dataset update to the task's counters.
    pub async fn on_dataset_update(
        &self,
        task: &Task,
        update: &DatasetUpdate,
    ) -> Result<TaskDatasetCounter, WorkerError> {
        if update.is_empty() {
            let counter =
                DatasetCounterRepo::get_or_init(&self.pool, task.project_id, task.id).await?;
            return Ok(counter);
        }
        let counter = self.update_counter(task, |state| state.apply_update(update)).await?;
        tracing::debug!(
            task_id = task.id,
            new = update.new_items.len(),
            assigned = update.assigned_items.len(),
            deleted = update.deleted_items.len(),
            dataset_size = counter.dataset_size,
            "Dataset counters updated"
        );
        Ok(counter)
    }

    /// Drop the counters of labels that left the task's label schema.
    pub async fn on_label_schema_changed(
        &self,
        task: &Task,
    ) -> Result<TaskDatasetCounter, WorkerError> {
        let label_ids: Vec<_> = LabelRepo::get_latest_labels_for_task(&self.pool, task.id, true)
            .await?
            .iter()
            .map(|l| l.id)
            .collect();

        let counter = self
            .update_counter(task, |state| {
                let removed = state.retain_labels(&label_ids);
                if removed > 0 {
                    tracing::info!(
                        task_id = task.id,
                        removed,
                        "Pruned counters of removed labels"
                    );
                }
            })
            .await?;
        Ok(counter)
    }

    async fn update_counter(
        &self,
        task: &Task,
        apply: impl Fn(&mut DatasetCounterState),
    ) -> Result<TaskDatasetCounter, WorkerError> {
        for attempt in 0..=self.max_retries {
            let current =
                DatasetCounterRepo::get_or_init(&self.pool, task.project_id, task.id).await?;
            let mut state = current.state();
            apply(&mut state);

            match DatasetCounterRepo::compare_and_swap(&self.pool, task.id, current.version, &state)
                .await?
            {
                Some(updated) => return Ok(updated),
                None => {
                    tracing::debug!(
                        task_id = task.id,
                        attempt,
                        version = current.version,
                        "Concurrent counter update, retrying"
                    );
                }
            }
        }

        tracing::warn!(
            task_id = task.id,
            retries = self.max_retries,
            "Giving up on dataset counter update"
        );
        Err(CoreError::Conflict(format!(
            "Dataset counters of task {} changed concurrently {} times",
            task.id,
            self.max_retries + 1
        ))
        .into())
    }
}
