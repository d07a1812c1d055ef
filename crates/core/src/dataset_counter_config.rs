//! Dataset counter configuration: thresholds gating manual and automatic
//! training of a task.

use serde::Serialize;
use serde_json::json;

use crate::configurable_parameters::{Parameter, ParameterGroup, ParameterSchema};
use crate::error::CoreError;
use crate::task::TaskType;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DATASET_COUNTER_SCHEMA: &str = "dataset_counter";

pub const REQUIRED_IMAGES_AUTO_TRAINING: &str = "required_images_auto_training";
pub const USE_DYNAMIC_REQUIRED_ANNOTATIONS: &str = "use_dynamic_required_annotations";
pub const LABEL_CONSTRAINT_FIRST_TRAINING: &str = "label_constraint_first_training";
pub const MINIMUM_ANNOTATIONS_MANUAL_TRAINING: &str = "minimum_annotations_manual_training";
pub const MINIMUM_ANNOTATIONS_PER_LABEL: &str = "minimum_annotations_per_label";

pub const DEFAULT_REQUIRED_IMAGES_AUTO_TRAINING: i64 = 12;
pub const DEFAULT_MINIMUM_ANNOTATIONS_MANUAL_TRAINING: i64 = 3;
pub const DEFAULT_MINIMUM_ANNOTATIONS_PER_LABEL: i64 = 10;

pub const MIN_REQUIRED_IMAGES_AUTO_TRAINING: i64 = 3;
pub const MAX_REQUIRED_IMAGES_AUTO_TRAINING: i64 = 10_000;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Parameter schema of the dataset counter component of one task.
#[derive(Debug, Clone, Copy)]
pub struct DatasetCounterSchema {
    pub task_type: TaskType,
}

impl DatasetCounterSchema {
    pub fn new(task_type: TaskType) -> Self {
        Self { task_type }
    }
}

impl ParameterSchema for DatasetCounterSchema {
    fn schema_name(&self) -> &'static str {
        DATASET_COUNTER_SCHEMA
    }

    fn default_parameters(&self) -> ParameterGroup {
        let mut label_constraint = Parameter::boolean("Label constraint for the first training", false)
            .with_description(
                "Require a minimum number of annotations per label before the first model is trained",
            );
        // Anomaly tasks only know the normal/anomalous pair; no per-label floor applies.
        if self.task_type.is_anomaly() {
            label_constraint = label_constraint.read_only().hidden();
        }

        ParameterGroup::new("Annotation requirements")
            .with_description("Thresholds for starting manual and automatic training")
            .with_parameter(
                REQUIRED_IMAGES_AUTO_TRAINING,
                Parameter::integer(
                    "Number of images required for auto-training",
                    DEFAULT_REQUIRED_IMAGES_AUTO_TRAINING,
                    MIN_REQUIRED_IMAGES_AUTO_TRAINING,
                    MAX_REQUIRED_IMAGES_AUTO_TRAINING,
                )
                .with_description("Number of annotated images that triggers the next auto-training round")
                .with_ui_rules(json!({
                    "operator": "AND",
                    "action": "DISABLE_EDITING",
                    "rules": [{
                        "parent": USE_DYNAMIC_REQUIRED_ANNOTATIONS,
                        "operator": "EQUAL_TO",
                        "value": true,
                        "type": "RULE"
                    }],
                    "type": "UI_RULES"
                })),
            )
            .with_parameter(
                USE_DYNAMIC_REQUIRED_ANNOTATIONS,
                Parameter::boolean("Dynamic required annotations", true).with_description(
                    "Derive the auto-training threshold from the performance of the latest model",
                ),
            )
            .with_parameter(LABEL_CONSTRAINT_FIRST_TRAINING, label_constraint)
            .with_parameter(
                MINIMUM_ANNOTATIONS_MANUAL_TRAINING,
                Parameter::integer(
                    "Minimum annotations for manual training",
                    DEFAULT_MINIMUM_ANNOTATIONS_MANUAL_TRAINING,
                    1,
                    MAX_REQUIRED_IMAGES_AUTO_TRAINING,
                )
                .read_only()
                .hidden(),
            )
            .with_parameter(
                MINIMUM_ANNOTATIONS_PER_LABEL,
                Parameter::integer(
                    "Minimum annotations per label for the first training",
                    DEFAULT_MINIMUM_ANNOTATIONS_PER_LABEL,
                    1,
                    MAX_REQUIRED_IMAGES_AUTO_TRAINING,
                )
                .read_only()
                .hidden(),
            )
    }
}

// ---------------------------------------------------------------------------
// Typed view
// ---------------------------------------------------------------------------

/// Typed values of a dataset counter parameter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetCounterConfig {
    pub required_images_auto_training: i64,
    pub label_constraint_first_training: bool,
    pub use_dynamic_required_annotations: bool,
    pub minimum_annotations_manual_training: i64,
    pub minimum_annotations_per_label: i64,
}

impl DatasetCounterConfig {
    pub fn from_parameters(parameters: &ParameterGroup) -> Result<Self, CoreError> {
        Ok(Self {
            required_images_auto_training: parameters.integer_value(&[REQUIRED_IMAGES_AUTO_TRAINING])?,
            label_constraint_first_training: parameters.bool_value(&[LABEL_CONSTRAINT_FIRST_TRAINING])?,
            use_dynamic_required_annotations: parameters
                .bool_value(&[USE_DYNAMIC_REQUIRED_ANNOTATIONS])?,
            minimum_annotations_manual_training: parameters
                .integer_value(&[MINIMUM_ANNOTATIONS_MANUAL_TRAINING])?,
            minimum_annotations_per_label: parameters.integer_value(&[MINIMUM_ANNOTATIONS_PER_LABEL])?,
        })
    }
}

impl Default for DatasetCounterConfig {
    fn default() -> Self {
        Self {
            required_images_auto_training: DEFAULT_REQUIRED_IMAGES_AUTO_TRAINING,
            label_constraint_first_training: false,
            use_dynamic_required_annotations: true,
            minimum_annotations_manual_training: DEFAULT_MINIMUM_ANNOTATIONS_MANUAL_TRAINING,
            minimum_annotations_per_label: DEFAULT_MINIMUM_ANNOTATIONS_PER_LABEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurable_parameters::{substitute_values, SubstitutionOptions};

    #[test]
    fn defaults_match_typed_default() {
        let tree = DatasetCounterSchema::new(TaskType::Detection).default_parameters();
        assert!(tree.validate().is_ok());
        assert_eq!(
            DatasetCounterConfig::from_parameters(&tree).unwrap(),
            DatasetCounterConfig::default()
        );
    }

    #[test]
    fn anomaly_hides_label_constraint() {
        let tree = DatasetCounterSchema::new(TaskType::AnomalyClassification).default_parameters();
        let p = tree.parameter(&[LABEL_CONSTRAINT_FIRST_TRAINING]).unwrap();
        assert!(!p.editable);
        assert!(!p.visible_in_ui);
    }

    #[test]
    fn ui_rules_do_not_leak_into_values() {
        let mut tree = DatasetCounterSchema::new(TaskType::Classification).default_parameters();
        let source = tree.to_json();
        substitute_values(&mut tree, &source, &SubstitutionOptions::strict()).unwrap();
        let config = DatasetCounterConfig::from_parameters(&tree).unwrap();
        assert!(config.use_dynamic_required_annotations);
    }

    #[test]
    fn typed_view_reads_substituted_values() {
        let mut tree = DatasetCounterSchema::new(TaskType::Segmentation).default_parameters();
        let source = serde_json::json!({
            REQUIRED_IMAGES_AUTO_TRAINING: {"value": 10},
            USE_DYNAMIC_REQUIRED_ANNOTATIONS: {"value": false},
            LABEL_CONSTRAINT_FIRST_TRAINING: {"value": true}
        });
        substitute_values(&mut tree, &source, &SubstitutionOptions::strict()).unwrap();
        let config = DatasetCounterConfig::from_parameters(&tree).unwrap();
        assert_eq!(config.required_images_auto_training, 10);
        assert!(!config.use_dynamic_required_annotations);
        assert!(config.label_constraint_first_training);
    }

    #[test]
    fn required_images_below_minimum_rejected() {
        let mut tree = DatasetCounterSchema::new(TaskType::Detection).default_parameters();
        let source = serde_json::json!({REQUIRED_IMAGES_AUTO_TRAINING: {"value": 2}});
        assert!(substitute_values(&mut tree, &source, &SubstitutionOptions::strict()).is_err());
        assert_eq!(
            tree.integer_value(&[REQUIRED_IMAGES_AUTO_TRAINING]).unwrap(),
            DEFAULT_REQUIRED_IMAGES_AUTO_TRAINING
        );
    }
}
