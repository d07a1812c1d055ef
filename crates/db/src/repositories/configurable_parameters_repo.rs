//! Repository for the `configurable_parameters` table.
//!
//! Records are append-only: every save inserts a row and the latest row of
//! an identifier wins. Stored data is never handed out as-is; it is
//! substituted into defaults rebuilt from code so that records written by
//! older schemas keep working.

use geti_core::configurable_parameters::{
    select_parameters, ParameterGroup, ParameterSchema, ResolvedParameters,
};
use geti_core::dataset_counter_config::{DatasetCounterConfig, DatasetCounterSchema};
use geti_core::entity_identifier::{ComponentType, EntityIdentifier};
use geti_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbError;
use crate::models::configurable_parameters::{
    ConfigurableParametersRow, ConfigurationRecord, NewConfiguration,
};
use crate::models::model::ModelStorage;
use crate::models::task::Task;

const COLUMNS: &str = "id, workspace_id, project_id, identifier_type, component_type, task_id, \
     model_storage_id, schema_name, data, single_use, created_at";

/// Configurable parameters of one project.
///
/// Built per request; every query is scoped to `project_id`.
#[derive(Debug, Clone, Copy)]
pub struct ConfigurableParametersRepo<'a> {
    pool: &'a PgPool,
    workspace_id: DbId,
    project_id: DbId,
}

impl<'a> ConfigurableParametersRepo<'a> {
    pub fn new(pool: &'a PgPool, workspace_id: DbId, project_id: DbId) -> Self {
        Self {
            pool,
            workspace_id,
            project_id,
        }
    }

    pub fn project_id(&self) -> DbId {
        self.project_id
    }

    // -----------------------------------------------------------------------
    // Raw rows
    // -----------------------------------------------------------------------

    /// Insert a new record for the identifier, returning the created row.
    pub async fn save(
        &self,
        input: &NewConfiguration,
    ) -> Result<ConfigurableParametersRow, sqlx::Error> {
        let identifier = &input.entity_identifier;
        let query = format!(
            "INSERT INTO configurable_parameters
                (workspace_id, project_id, identifier_type, component_type, task_id,
                 model_storage_id, schema_name, data, single_use)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConfigurableParametersRow>(&query)
            .bind(self.workspace_id)
            .bind(self.project_id)
            .bind(identifier.type_str())
            .bind(identifier.component_type().map(|c| c.as_str()))
            .bind(identifier.task_id())
            .bind(identifier.model_storage_id())
            .bind(&input.schema_name)
            .bind(input.data.to_json())
            .bind(input.single_use)
            .fetch_one(self.pool)
            .await
    }

    /// The latest record of an identifier. Single-use records are only
    /// considered when `include_single_use` is set.
    pub async fn get_latest_by_identifier(
        &self,
        identifier: &EntityIdentifier,
        include_single_use: bool,
    ) -> Result<Option<ConfigurableParametersRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM configurable_parameters
             WHERE project_id = $1
               AND identifier_type = $2
               AND component_type IS NOT DISTINCT FROM $3
               AND task_id IS NOT DISTINCT FROM $4
               AND model_storage_id IS NOT DISTINCT FROM $5
               AND ($6 OR NOT single_use)
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ConfigurableParametersRow>(&query)
            .bind(self.project_id)
            .bind(identifier.type_str())
            .bind(identifier.component_type().map(|c| c.as_str()))
            .bind(identifier.task_id())
            .bind(identifier.model_storage_id())
            .bind(include_single_use)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn get_by_id(
        &self,
        id: DbId,
    ) -> Result<Option<ConfigurableParametersRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM configurable_parameters WHERE id = $1 AND project_id = $2"
        );
        sqlx::query_as::<_, ConfigurableParametersRow>(&query)
            .bind(id)
            .bind(self.project_id)
            .fetch_optional(self.pool)
            .await
    }

    /// Delete every record of an identifier, single-use ones included.
    /// Returns the number of rows removed.
    pub async fn delete_all_by_identifier(
        &self,
        identifier: &EntityIdentifier,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM configurable_parameters
             WHERE project_id = $1
               AND identifier_type = $2
               AND component_type IS NOT DISTINCT FROM $3
               AND task_id IS NOT DISTINCT FROM $4
               AND model_storage_id IS NOT DISTINCT FROM $5",
        )
        .bind(self.project_id)
        .bind(identifier.type_str())
        .bind(identifier.component_type().map(|c| c.as_str()))
        .bind(identifier.task_id())
        .bind(identifier.model_storage_id())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Get-or-create
    // -----------------------------------------------------------------------

    /// Component parameters of `component_type`, optionally per task.
    pub async fn get_or_create_component_parameters(
        &self,
        schema: &dyn ParameterSchema,
        component_type: ComponentType,
        task_id: Option<DbId>,
    ) -> Result<ConfigurationRecord, DbError> {
        let identifier = EntityIdentifier::component(component_type, task_id);
        self.get_or_create(identifier, schema.schema_name(), schema.default_parameters())
            .await
    }

    /// Hyper parameters of a model storage.
    ///
    /// Defaults come from `schema` when given, otherwise from the model
    /// template's tree stored on the model storage.
    pub async fn get_or_create_hyper_parameters(
        &self,
        model_storage: &ModelStorage,
        schema: Option<&dyn ParameterSchema>,
    ) -> Result<ConfigurationRecord, DbError> {
        let identifier = EntityIdentifier::model_storage(model_storage.id);
        let (schema_name, defaults) = match schema {
            Some(schema) => (schema.schema_name(), schema.default_parameters()),
            None => (
                model_storage.model_template_id.as_str(),
                model_storage.default_hyper_parameters()?,
            ),
        };
        self.get_or_create(identifier, schema_name, defaults).await
    }

    /// Persist a one-off hyper parameter tree for a single training job.
    /// It is never returned by [`Self::get_or_create_hyper_parameters`].
    pub async fn create_single_use_hyper_parameters(
        &self,
        model_storage: &ModelStorage,
        schema_name: &str,
        parameters: &ParameterGroup,
    ) -> Result<ConfigurationRecord, DbError> {
        parameters.validate()?;
        let row = self
            .save(&NewConfiguration {
                entity_identifier: EntityIdentifier::model_storage(model_storage.id),
                schema_name: schema_name.to_string(),
                data: parameters.clone(),
                single_use: true,
            })
            .await?;
        tracing::debug!(
            config_id = row.id,
            model_storage_id = model_storage.id,
            "Created single-use hyper parameters"
        );
        Ok(row.into_record(parameters.clone())?)
    }

    /// Typed dataset counter configuration of a task.
    pub async fn get_dataset_counter_config(
        &self,
        task: &Task,
    ) -> Result<DatasetCounterConfig, DbError> {
        let schema = DatasetCounterSchema::new(task.task_type()?);
        let record = self
            .get_or_create_component_parameters(
                &schema,
                ComponentType::DatasetCounter,
                Some(task.id),
            )
            .await?;
        Ok(DatasetCounterConfig::from_parameters(&record.data)?)
    }

    async fn get_or_create(
        &self,
        identifier: EntityIdentifier,
        schema_name: &str,
        defaults: ParameterGroup,
    ) -> Result<ConfigurationRecord, DbError> {
        let Some(row) = self.get_latest_by_identifier(&identifier, false).await? else {
            let row = self
                .save(&NewConfiguration {
                    entity_identifier: identifier,
                    schema_name: schema_name.to_string(),
                    data: defaults.clone(),
                    single_use: false,
                })
                .await?;
            tracing::info!(
                config_id = row.id,
                project_id = self.project_id,
                identifier_type = identifier.type_str(),
                schema = schema_name,
                "Persisted default configurable parameters"
            );
            return Ok(row.into_record(defaults)?);
        };

        let data = match select_parameters(&defaults, Some(&row.data)) {
            ResolvedParameters::Stored(tree) => tree,
            ResolvedParameters::Defaults { parameters, rejected } => {
                tracing::warn!(
                    config_id = row.id,
                    project_id = self.project_id,
                    schema = schema_name,
                    error = ?rejected,
                    "Stored configurable parameters are invalid, using defaults"
                );
                parameters
            }
        };
        Ok(row.into_record(data)?)
    }
}
