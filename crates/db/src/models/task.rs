//! Pipeline task entity model and DTO.

use geti_core::error::CoreError;
use geti_core::task::TaskType;
use geti_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub task_type: String,
    pub created_at: Timestamp,
}

impl Task {
    /// The typed task type. Fails only if the column holds a value the
    /// migration's check constraint would have rejected.
    pub fn task_type(&self) -> Result<TaskType, CoreError> {
        TaskType::parse(&self.task_type)
    }
}

/// DTO for creating a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    pub project_id: DbId,
    pub title: String,
    pub task_type: TaskType,
}
