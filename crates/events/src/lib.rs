//! Event bus and dataset event payloads.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope.
//! - [`payloads`]: typed payloads of the dataset-readiness events.

pub mod bus;
pub mod payloads;

pub use bus::{EventBus, PlatformEvent, DEFAULT_CAPACITY};
pub use payloads::{
    AnnotationSceneSavedPayload, DatasetUpdatedPayload, EventPayload, LabelSchemaChangedPayload,
    ModelActivatedPayload,
};
