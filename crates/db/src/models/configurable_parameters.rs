//! Persisted configurable parameter records.
//!
//! Rows map to the `configurable_parameters` table. The `data` column holds
//! the dict form of the tree; it is only trusted after being substituted
//! into freshly built defaults (see `ConfigurableParametersRepo`).

use geti_core::configurable_parameters::ParameterGroup;
use geti_core::entity_identifier::EntityIdentifier;
use geti_core::error::CoreError;
use geti_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `configurable_parameters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConfigurableParametersRow {
    pub id: DbId,
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub identifier_type: String,
    pub component_type: Option<String>,
    pub task_id: Option<DbId>,
    pub model_storage_id: Option<DbId>,
    pub schema_name: String,
    pub data: serde_json::Value,
    pub single_use: bool,
    pub created_at: Timestamp,
}

impl ConfigurableParametersRow {
    pub fn entity_identifier(&self) -> Result<EntityIdentifier, CoreError> {
        EntityIdentifier::from_parts(
            &self.identifier_type,
            self.component_type.as_deref(),
            self.task_id,
            self.model_storage_id,
        )
    }

    /// Attach an effective tree to this row's metadata.
    pub fn into_record(self, data: ParameterGroup) -> Result<ConfigurationRecord, CoreError> {
        Ok(ConfigurationRecord {
            entity_identifier: self.entity_identifier()?,
            id: self.id,
            workspace_id: self.workspace_id,
            project_id: self.project_id,
            schema_name: self.schema_name,
            data,
            single_use: self.single_use,
            created_at: self.created_at,
        })
    }
}

/// Insert DTO for a new configuration row.
#[derive(Debug, Clone)]
pub struct NewConfiguration {
    pub entity_identifier: EntityIdentifier,
    pub schema_name: String,
    pub data: ParameterGroup,
    pub single_use: bool,
}

/// A configuration record with its resolved parameter tree.
#[derive(Debug, Clone)]
pub struct ConfigurationRecord {
    pub id: DbId,
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub entity_identifier: EntityIdentifier,
    pub schema_name: String,
    pub data: ParameterGroup,
    /// Single-use records belong to one training job and are skipped by
    /// get-or-create lookups.
    pub single_use: bool,
    pub created_at: Timestamp,
}
