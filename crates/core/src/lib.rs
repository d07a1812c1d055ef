//! Domain logic for dataset readiness and configurable parameters.
//!
//! The `core` crate contains no database dependencies: repositories load
//! the data, the functions here decide.

pub mod annotation_state;
pub mod configurable_parameters;
pub mod dataset_counter;
pub mod dataset_counter_config;
pub mod dynamic_required_annotations;
pub mod entity_identifier;
pub mod error;
pub mod hyper_parameters;
pub mod task;
pub mod types;
