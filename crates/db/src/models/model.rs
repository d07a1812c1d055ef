//! Model storage and trained model entities.

use geti_core::configurable_parameters::ParameterGroup;
use geti_core::dynamic_required_annotations::ModelPerformance;
use geti_core::error::CoreError;
use geti_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Model storage
// ---------------------------------------------------------------------------

/// A row from the `model_storages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModelStorage {
    pub id: DbId,
    pub project_id: DbId,
    pub task_id: DbId,
    pub model_template_id: String,
    /// Default hyper parameter tree declared by the model template, in
    /// dict form.
    pub hyper_parameters: serde_json::Value,
    pub created_at: Timestamp,
}

impl ModelStorage {
    /// Parse the template's hyper parameter defaults.
    pub fn default_hyper_parameters(&self) -> Result<ParameterGroup, CoreError> {
        ParameterGroup::from_json(&self.hyper_parameters)
    }
}

/// DTO for creating a new model storage.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateModelStorage {
    pub project_id: DbId,
    pub task_id: DbId,
    pub model_template_id: String,
    pub hyper_parameters: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A row from the `models` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Model {
    pub id: DbId,
    pub model_storage_id: DbId,
    /// Score in `[0, 1]`, `None` until evaluated.
    pub performance: Option<f64>,
    pub training_dataset_size: i64,
    pub created_at: Timestamp,
}

impl Model {
    pub fn model_performance(&self) -> ModelPerformance {
        ModelPerformance {
            performance: self.performance,
            dataset_count: self.training_dataset_size,
        }
    }
}

/// DTO for registering a trained model.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateModel {
    pub model_storage_id: DbId,
    pub performance: Option<f64>,
    pub training_dataset_size: i64,
}

/// Performance of one model, returned by batch lookups.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct ModelPerformanceRow {
    pub id: DbId,
    pub performance: Option<f64>,
}
