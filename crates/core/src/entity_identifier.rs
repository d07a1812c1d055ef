//! Identifiers for what a configuration record configures.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub const IDENTIFIER_COMPONENT: &str = "component_parameters";
pub const IDENTIFIER_HYPER_PARAMETERS: &str = "hyper_parameters";

/// Pipeline components that own configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    DatasetCounter,
    SubsetManager,
    PipelineDatasetManager,
    TaskNode,
    DefaultComponent,
}

const VALID_COMPONENT_TYPES: &[&str] = &[
    "DATASET_COUNTER",
    "SUBSET_MANAGER",
    "PIPELINE_DATASET_MANAGER",
    "TASK_NODE",
    "DEFAULT_COMPONENT",
];

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DatasetCounter => "DATASET_COUNTER",
            Self::SubsetManager => "SUBSET_MANAGER",
            Self::PipelineDatasetManager => "PIPELINE_DATASET_MANAGER",
            Self::TaskNode => "TASK_NODE",
            Self::DefaultComponent => "DEFAULT_COMPONENT",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "DATASET_COUNTER" => Ok(Self::DatasetCounter),
            "SUBSET_MANAGER" => Ok(Self::SubsetManager),
            "PIPELINE_DATASET_MANAGER" => Ok(Self::PipelineDatasetManager),
            "TASK_NODE" => Ok(Self::TaskNode),
            "DEFAULT_COMPONENT" => Ok(Self::DefaultComponent),
            _ => Err(CoreError::Validation(format!(
                "Invalid component type '{s}'. Must be one of: {}",
                VALID_COMPONENT_TYPES.join(", ")
            ))),
        }
    }
}

/// What a parameter tree configures. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityIdentifier {
    /// Project-scoped component configuration, optionally per task.
    #[serde(rename = "component_parameters")]
    Component {
        component_type: ComponentType,
        task_id: Option<DbId>,
    },
    /// Hyper parameters of one model storage.
    #[serde(rename = "hyper_parameters")]
    ModelStorage { model_storage_id: DbId },
}

impl EntityIdentifier {
    pub fn component(component_type: ComponentType, task_id: Option<DbId>) -> Self {
        Self::Component {
            component_type,
            task_id,
        }
    }

    pub fn model_storage(model_storage_id: DbId) -> Self {
        Self::ModelStorage { model_storage_id }
    }

    /// Discriminator persisted in the `identifier_type` column.
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Component { .. } => IDENTIFIER_COMPONENT,
            Self::ModelStorage { .. } => IDENTIFIER_HYPER_PARAMETERS,
        }
    }

    pub fn component_type(&self) -> Option<ComponentType> {
        match self {
            Self::Component { component_type, .. } => Some(*component_type),
            Self::ModelStorage { .. } => None,
        }
    }

    pub fn task_id(&self) -> Option<DbId> {
        match self {
            Self::Component { task_id, .. } => *task_id,
            Self::ModelStorage { .. } => None,
        }
    }

    pub fn model_storage_id(&self) -> Option<DbId> {
        match self {
            Self::Component { .. } => None,
            Self::ModelStorage { model_storage_id } => Some(*model_storage_id),
        }
    }

    /// Rebuild an identifier from its persisted columns.
    pub fn from_parts(
        identifier_type: &str,
        component_type: Option<&str>,
        task_id: Option<DbId>,
        model_storage_id: Option<DbId>,
    ) -> Result<Self, CoreError> {
        match identifier_type {
            IDENTIFIER_COMPONENT => {
                let component_type = component_type.ok_or_else(|| {
                    CoreError::Validation("component identifier without component_type".into())
                })?;
                Ok(Self::component(ComponentType::parse(component_type)?, task_id))
            }
            IDENTIFIER_HYPER_PARAMETERS => {
                let model_storage_id = model_storage_id.ok_or_else(|| {
                    CoreError::Validation("hyper parameter identifier without model_storage_id".into())
                })?;
                Ok(Self::model_storage(model_storage_id))
            }
            other => Err(CoreError::Validation(format!(
                "Invalid identifier type '{other}'. Must be one of: {IDENTIFIER_COMPONENT}, \
                 {IDENTIFIER_HYPER_PARAMETERS}"
            ))),
        }
    }

    /// The identifier as a plain JSON dict.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_is_structural() {
        let a = EntityIdentifier::component(ComponentType::DatasetCounter, Some(4));
        let b = EntityIdentifier::component(ComponentType::DatasetCounter, Some(4));
        let c = EntityIdentifier::component(ComponentType::DatasetCounter, None);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, EntityIdentifier::model_storage(4));
    }

    #[test]
    fn to_json_is_tagged() {
        assert_eq!(
            EntityIdentifier::component(ComponentType::TaskNode, None).to_json(),
            json!({"type": "component_parameters", "component_type": "TASK_NODE", "task_id": null})
        );
        assert_eq!(
            EntityIdentifier::model_storage(9).to_json(),
            json!({"type": "hyper_parameters", "model_storage_id": 9})
        );
    }

    #[test]
    fn from_parts_round_trip() {
        for id in [
            EntityIdentifier::component(ComponentType::SubsetManager, Some(1)),
            EntityIdentifier::model_storage(77),
        ] {
            let rebuilt = EntityIdentifier::from_parts(
                id.type_str(),
                id.component_type().map(|c| c.as_str()),
                id.task_id(),
                id.model_storage_id(),
            )
            .unwrap();
            assert_eq!(rebuilt, id);
        }
    }

    #[test]
    fn from_parts_rejects_incomplete_component() {
        assert!(EntityIdentifier::from_parts(IDENTIFIER_COMPONENT, None, Some(1), None).is_err());
        assert!(EntityIdentifier::from_parts("other", None, None, None).is_err());
    }
}
