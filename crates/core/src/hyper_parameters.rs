//! Built-in hyper parameter schema for model training.
//!
//! Model templates normally ship their own defaults as a parameter dict;
//! this schema is used when the caller supplies an explicit data type.

use crate::configurable_parameters::{
    ModelLifecycle, Parameter, ParameterGroup, ParameterSchema, SelectableOption,
};

pub const TRAINING_HYPER_PARAMETERS_SCHEMA: &str = "training_hyper_parameters";

pub const LEARNING_PARAMETERS: &str = "learning_parameters";
pub const POSTPROCESSING: &str = "postprocessing";

#[derive(Debug, Clone, Copy, Default)]
pub struct TrainingHyperParameterSchema;

impl ParameterSchema for TrainingHyperParameterSchema {
    fn schema_name(&self) -> &'static str {
        TRAINING_HYPER_PARAMETERS_SCHEMA
    }

    fn default_parameters(&self) -> ParameterGroup {
        let learning = ParameterGroup::new("Learning parameters")
            .with_parameter(
                "batch_size",
                Parameter::integer("Batch size", 8, 1, 512)
                    .affecting(ModelLifecycle::Training)
                    .with_warning("Large batch sizes may exceed the accelerator memory"),
            )
            .with_parameter(
                "num_iters",
                Parameter::integer("Number of training iterations", 100, 1, 100_000)
                    .affecting(ModelLifecycle::Training),
            )
            .with_parameter(
                "learning_rate",
                Parameter::float("Learning rate", 0.001, 1e-7, 1.0).affecting(ModelLifecycle::Training),
            )
            .with_parameter(
                "optimizer",
                Parameter::selectable(
                    "Optimizer",
                    "sgd",
                    vec![
                        SelectableOption::new("SGD", "sgd"),
                        SelectableOption::new("Adam", "adam"),
                        SelectableOption::new("AdamW", "adamw"),
                    ],
                )
                .affecting(ModelLifecycle::Architecture),
            )
            .with_parameter(
                "enable_early_stopping",
                Parameter::boolean("Early stopping", true).affecting(ModelLifecycle::Training),
            );

        let postprocessing = ParameterGroup::new("Postprocessing").with_parameter(
            "confidence_threshold",
            Parameter::float("Confidence threshold", 0.35, 0.0, 1.0).affecting(ModelLifecycle::Inference),
        );

        ParameterGroup::new("Hyper parameters")
            .with_group(LEARNING_PARAMETERS, learning)
            .with_group(POSTPROCESSING, postprocessing)
    }
}
