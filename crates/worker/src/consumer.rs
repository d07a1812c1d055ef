//! Event consumer loop of the worker.
//!
//! Subscribes to the [`EventBus`](geti_events::EventBus) and dispatches
//! each dataset-readiness event to its handler. Handler failures are
//! logged and never stop the loop.

use geti_core::dataset_counter::{DatasetItemLabels, DatasetUpdate};
use geti_core::error::CoreError;
use geti_core::types::DbId;
use geti_db::models::task::Task;
use geti_db::repositories::{AnnotationSceneStateRepo, TaskRepo};
use geti_events::payloads::{
    EVENT_ANNOTATION_SCENE_SAVED, EVENT_DATASET_UPDATED, EVENT_LABEL_SCHEMA_CHANGED,
    EVENT_MODEL_ACTIVATED,
};
use geti_events::{
    AnnotationSceneSavedPayload, DatasetUpdatedPayload, LabelSchemaChangedPayload,
    ModelActivatedPayload, PlatformEvent,
};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::dataset_counter::DatasetCounterService;
use crate::dynamic_required_annotations::DynamicRequiredAnnotations;
use crate::error::WorkerError;
use crate::missing_annotations::MissingAnnotationsHelper;

/// What a dispatched event led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// The event type has no handler in this worker.
    Ignored,
}

pub struct EventConsumer {
    pool: PgPool,
    counters: DatasetCounterService,
    missing_annotations: MissingAnnotationsHelper,
    dynamic_required: DynamicRequiredAnnotations,
}

impl EventConsumer {
    pub fn new(pool: PgPool, counter_update_retries: u32) -> Self {
        Self {
            counters: DatasetCounterService::new(pool.clone(), counter_update_retries),
            missing_annotations: MissingAnnotationsHelper::new(pool.clone()),
            dynamic_required: DynamicRequiredAnnotations::new(pool.clone()),
            pool,
        }
    }

    /// Run the consumer loop until `cancel` fires or the bus is dropped.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Event consumer started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event consumer stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => {
                        if let Err(e) = self.dispatch(&event).await {
                            tracing::error!(
                                error = %e,
                                event_type = %event.event_type,
                                project_id = event.project_id,
                                "Failed to handle event"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Event consumer lagged, some dataset events were not applied"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, consumer shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Handle a single event.
    pub async fn dispatch(&self, event: &PlatformEvent) -> Result<Dispatch, WorkerError> {
        match event.event_type.as_str() {
            EVENT_DATASET_UPDATED => {
                let payload: DatasetUpdatedPayload = event.decode_payload()?;
                let task = self.task(payload.task_id).await?;
                self.counters.on_dataset_update(&task, &payload.update).await?;

                let report = self
                    .missing_annotations
                    .get_missing_annotations_for_task(payload.workspace_id, &task)
                    .await?;
                tracing::info!(
                    task_id = task.id,
                    missing_manual = report.total_missing_manual_training,
                    missing_auto = report.total_missing_auto_training,
                    ready_for_auto_training = report.is_ready_for_auto_training(),
                    "Dataset readiness updated"
                );
            }
            EVENT_LABEL_SCHEMA_CHANGED => {
                let payload: LabelSchemaChangedPayload = event.decode_payload()?;
                let task = self.task(payload.task_id).await?;
                self.counters.on_label_schema_changed(&task).await?;
            }
            EVENT_MODEL_ACTIVATED => {
                let payload: ModelActivatedPayload = event.decode_payload()?;
                let task = self.task(payload.task_id).await?;
                self.dynamic_required
                    .update_for_active_model(payload.workspace_id, &task, payload.model_id)
                    .await?;
            }
            EVENT_ANNOTATION_SCENE_SAVED => {
                let payload: AnnotationSceneSavedPayload = event.decode_payload()?;
                self.on_annotation_scene_saved(&payload).await?;
            }
            other => {
                tracing::trace!(event_type = other, "Ignoring event");
                return Ok(Dispatch::Ignored);
            }
        }
        Ok(Dispatch::Handled)
    }

    async fn task(&self, task_id: DbId) -> Result<Task, WorkerError> {
        TaskRepo::find_by_id(&self.pool, task_id)
            .await?
            .ok_or(WorkerError::Core(CoreError::NotFound {
                entity: "task",
                id: task_id,
            }))
    }

    /// Count the media's dataset item for every task the recorded state
    /// marks as annotated, and drop it for the others.
    async fn on_annotation_scene_saved(
        &self,
        payload: &AnnotationSceneSavedPayload,
    ) -> Result<(), WorkerError> {
        let row = AnnotationSceneStateRepo::get_latest_for_annotation_scene(
            &self.pool,
            payload.annotation_scene_id,
        )
        .await?
        .ok_or(WorkerError::Core(CoreError::NotFound {
            entity: "annotation_scene_state",
            id: payload.annotation_scene_id,
        }))?;
        let state = row.to_state();

        for task in TaskRepo::list_by_project(&self.pool, payload.project_id).await? {
            let labels = payload
                .labels_per_task
                .get(&task.id)
                .cloned()
                .unwrap_or_default();
            let item = vec![DatasetItemLabels::new(payload.dataset_item_id, labels)];
            let update = if state.is_annotated_for_task(task.id) {
                DatasetUpdate {
                    new_items: item,
                    ..Default::default()
                }
            } else {
                DatasetUpdate {
                    deleted_items: item,
                    ..Default::default()
                }
            };
            let counter = self.counters.on_dataset_update(&task, &update).await?;
            tracing::debug!(
                task_id = task.id,
                media_id = payload.media_identifier.media_id,
                item_id = payload.dataset_item_id,
                state = state.state_for_task(task.id).as_str(),
                dataset_size = counter.dataset_size,
                "Annotation scene state applied to dataset counters"
            );
        }
        Ok(())
    }
}
