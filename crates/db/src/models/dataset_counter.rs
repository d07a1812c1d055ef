//! Per-task dataset counter rows.

use std::collections::BTreeMap;

use geti_core::dataset_counter::DatasetCounterState;
use geti_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `task_dataset_counters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskDatasetCounter {
    pub task_id: DbId,
    pub project_id: DbId,
    pub dataset_size: i64,
    pub label_counts: Json<BTreeMap<DbId, i64>>,
    #[serde(skip)]
    pub counted_items: Json<BTreeMap<DbId, Vec<DbId>>>,
    /// Last output of the dynamic required annotations formula, `None`
    /// when the task has no evaluated model.
    pub dynamic_required_annotations: Option<i64>,
    /// Optimistic concurrency token.
    pub version: i64,
    pub updated_at: Timestamp,
}

impl TaskDatasetCounter {
    pub fn state(&self) -> DatasetCounterState {
        DatasetCounterState {
            dataset_size: self.dataset_size,
            label_counts: self.label_counts.0.clone(),
            counted_items: self.counted_items.0.clone(),
        }
    }
}
