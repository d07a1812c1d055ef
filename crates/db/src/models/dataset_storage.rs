//! Dataset storage entity model and DTO.

use geti_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `dataset_storages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DatasetStorage {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    pub use_for_training: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a new dataset storage.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDatasetStorage {
    pub project_id: DbId,
    pub name: String,
    #[serde(default)]
    pub use_for_training: bool,
}
