//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. The exception is
//! [`ConfigurableParametersRepo`], which is built per request with the pool
//! and the workspace/project scope it reads and writes.

pub mod annotation_scene_state_repo;
pub mod configurable_parameters_repo;
pub mod dataset_counter_repo;
pub mod dataset_storage_repo;
pub mod label_repo;
pub mod media_repo;
pub mod model_repo;
pub mod project_repo;
pub mod task_repo;

pub use annotation_scene_state_repo::AnnotationSceneStateRepo;
pub use configurable_parameters_repo::ConfigurableParametersRepo;
pub use dataset_counter_repo::DatasetCounterRepo;
pub use dataset_storage_repo::DatasetStorageRepo;
pub use label_repo::LabelRepo;
pub use media_repo::MediaRepo;
pub use model_repo::{ModelRepo, ModelStorageRepo};
pub use project_repo::ProjectRepo;
pub use task_repo::TaskRepo;
