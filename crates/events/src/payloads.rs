//! Typed payloads of the events driving dataset readiness.
//!
//! | Event type              | Payload                         | Source entity     |
//! |-------------------------|---------------------------------|-------------------|
//! | `dataset.updated`       | [`DatasetUpdatedPayload`]       | `task`            |
//! | `label_schema.changed`  | [`LabelSchemaChangedPayload`]   | `task`            |
//! | `model.activated`       | [`ModelActivatedPayload`]       | `model`           |
//! | `annotation_scene.saved`| [`AnnotationSceneSavedPayload`] | `annotation_scene`|

use std::collections::BTreeMap;

use geti_core::annotation_state::MediaIdentifier;
use geti_core::dataset_counter::DatasetUpdate;
use geti_core::types::DbId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::bus::PlatformEvent;

pub const EVENT_DATASET_UPDATED: &str = "dataset.updated";
pub const EVENT_LABEL_SCHEMA_CHANGED: &str = "label_schema.changed";
pub const EVENT_MODEL_ACTIVATED: &str = "model.activated";
pub const EVENT_ANNOTATION_SCENE_SAVED: &str = "annotation_scene.saved";

/// A payload bound to one event type.
pub trait EventPayload: Serialize + DeserializeOwned {
    const EVENT_TYPE: &'static str;
    const SOURCE_ENTITY: &'static str;

    fn workspace_id(&self) -> DbId;
    fn project_id(&self) -> DbId;
    fn source_entity_id(&self) -> DbId;

    /// Wrap the payload into an event envelope.
    fn to_event(&self) -> Result<PlatformEvent, serde_json::Error> {
        Ok(
            PlatformEvent::new(Self::EVENT_TYPE, self.workspace_id(), self.project_id())
                .with_source(Self::SOURCE_ENTITY, self.source_entity_id())
                .with_payload(serde_json::to_value(self)?),
        )
    }
}

/// Items were added to, removed from or assigned to a task's dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetUpdatedPayload {
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub task_id: DbId,
    pub update: DatasetUpdate,
}

impl EventPayload for DatasetUpdatedPayload {
    const EVENT_TYPE: &'static str = EVENT_DATASET_UPDATED;
    const SOURCE_ENTITY: &'static str = "task";

    fn workspace_id(&self) -> DbId {
        self.workspace_id
    }

    fn project_id(&self) -> DbId {
        self.project_id
    }

    fn source_entity_id(&self) -> DbId {
        self.task_id
    }
}

/// A new label schema version was stored for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSchemaChangedPayload {
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub task_id: DbId,
}

impl EventPayload for LabelSchemaChangedPayload {
    const EVENT_TYPE: &'static str = EVENT_LABEL_SCHEMA_CHANGED;
    const SOURCE_ENTITY: &'static str = "task";

    fn workspace_id(&self) -> DbId {
        self.workspace_id
    }

    fn project_id(&self) -> DbId {
        self.project_id
    }

    fn source_entity_id(&self) -> DbId {
        self.task_id
    }
}

/// A newly trained model became the task's active model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelActivatedPayload {
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub task_id: DbId,
    pub model_id: DbId,
}

impl EventPayload for ModelActivatedPayload {
    const EVENT_TYPE: &'static str = EVENT_MODEL_ACTIVATED;
    const SOURCE_ENTITY: &'static str = "model";

    fn workspace_id(&self) -> DbId {
        self.workspace_id
    }

    fn project_id(&self) -> DbId {
        self.project_id
    }

    fn source_entity_id(&self) -> DbId {
        self.model_id
    }
}

/// An annotation scene was saved and its state recorded.
///
/// `dataset_item_id` is the training dataset item of the media; it is
/// counted for every task the saved state marks as annotated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSceneSavedPayload {
    pub workspace_id: DbId,
    pub project_id: DbId,
    pub dataset_storage_id: DbId,
    pub annotation_scene_id: DbId,
    pub media_identifier: MediaIdentifier,
    pub dataset_item_id: DbId,
    /// Labels of the saved annotations, per task.
    #[serde(default)]
    pub labels_per_task: BTreeMap<DbId, Vec<DbId>>,
}

impl EventPayload for AnnotationSceneSavedPayload {
    const EVENT_TYPE: &'static str = EVENT_ANNOTATION_SCENE_SAVED;
    const SOURCE_ENTITY: &'static str = "annotation_scene";

    fn workspace_id(&self) -> DbId {
        self.workspace_id
    }

    fn project_id(&self) -> DbId {
        self.project_id
    }

    fn source_entity_id(&self) -> DbId {
        self.annotation_scene_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geti_core::dataset_counter::DatasetItemLabels;

    #[test]
    fn dataset_update_event_carries_typed_payload() {
        let payload = DatasetUpdatedPayload {
            workspace_id: 1,
            project_id: 2,
            task_id: 3,
            update: DatasetUpdate {
                new_items: vec![DatasetItemLabels::new(10, vec![4, 5])],
                ..Default::default()
            },
        };
        let event = payload.to_event().unwrap();
        assert_eq!(event.event_type, EVENT_DATASET_UPDATED);
        assert_eq!(event.project_id, 2);
        assert_eq!(event.source_entity_type.as_deref(), Some("task"));
        assert_eq!(event.source_entity_id, Some(3));

        let decoded: DatasetUpdatedPayload = event.decode_payload().unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn model_event_is_sourced_from_the_model() {
        let event = ModelActivatedPayload {
            workspace_id: 1,
            project_id: 2,
            task_id: 3,
            model_id: 77,
        }
        .to_event()
        .unwrap();
        assert_eq!(event.event_type, "model.activated");
        assert_eq!(event.source_entity_type.as_deref(), Some("model"));
        assert_eq!(event.source_entity_id, Some(77));
    }

    #[test]
    fn annotation_scene_payload_keeps_frame_index() {
        let event = AnnotationSceneSavedPayload {
            workspace_id: 1,
            project_id: 2,
            dataset_storage_id: 5,
            annotation_scene_id: 8,
            media_identifier: MediaIdentifier::video_frame(13, 24),
            dataset_item_id: 40,
            labels_per_task: BTreeMap::from([(3, vec![6])]),
        }
        .to_event()
        .unwrap();
        assert_eq!(event.payload["media_identifier"]["frame_index"], 24);
        assert_eq!(event.payload["labels_per_task"]["3"], serde_json::json!([6]));

        let decoded: AnnotationSceneSavedPayload = event.decode_payload().unwrap();
        assert_eq!(decoded.dataset_item_id, 40);
        assert_eq!(decoded.labels_per_task.get(&3), Some(&vec![6]));
    }
}
