//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts

pub mod annotation_scene_state;
pub mod configurable_parameters;
pub mod dataset_counter;
pub mod dataset_storage;
pub mod label;
pub mod media;
pub mod model;
pub mod project;
pub mod task;
