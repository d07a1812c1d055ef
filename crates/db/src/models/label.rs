//! Label and label schema models.

use geti_core::dataset_counter::TaskLabel;
use geti_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// A row from the `labels` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Label {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    /// The "no object" label of a task. Never gets a per-label requirement.
    pub is_empty: bool,
    pub created_at: Timestamp,
}

impl Label {
    pub fn to_task_label(&self) -> TaskLabel {
        TaskLabel {
            id: self.id,
            name: self.name.clone(),
            is_empty: self.is_empty,
        }
    }
}

/// DTO for creating a new label.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabel {
    pub project_id: DbId,
    pub name: String,
    #[serde(default)]
    pub is_empty: bool,
}

// ---------------------------------------------------------------------------
// Label schema
// ---------------------------------------------------------------------------

/// A row from the `label_schemas` table. The latest row of a task is its
/// current schema.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LabelSchema {
    pub id: DbId,
    pub task_id: DbId,
    pub created_at: Timestamp,
}
