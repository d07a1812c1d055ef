//! Dataset-readiness worker.
//!
//! Consumes dataset events from the [`geti_events::EventBus`] and keeps the
//! per-task dataset counters and dynamic annotation requirements current.
//! The missing-annotations report is derived on demand from that state.

pub mod config;
pub mod consumer;
pub mod dataset_counter;
pub mod dynamic_required_annotations;
pub mod error;
pub mod missing_annotations;

pub use config::WorkerConfig;
pub use consumer::EventConsumer;
pub use dataset_counter::DatasetCounterService;
pub use dynamic_required_annotations::DynamicRequiredAnnotations;
pub use error::WorkerError;
pub use missing_annotations::MissingAnnotationsHelper;
