//! Annotation scene state history rows.

use std::collections::BTreeMap;

use geti_core::annotation_state::{AnnotationSceneState, AnnotationState, MediaIdentifier};
use geti_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `annotation_scene_states` table.
///
/// Rows are append-only; the most recent row of an annotation scene (or of
/// a media identifier) is authoritative.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnnotationSceneStateRow {
    pub id: DbId,
    pub dataset_storage_id: DbId,
    pub media_id: DbId,
    pub frame_index: Option<i64>,
    pub annotation_scene_id: DbId,
    pub state_per_task: Json<BTreeMap<DbId, AnnotationState>>,
    pub unannotated_rois: Json<BTreeMap<DbId, Vec<DbId>>>,
    pub created_at: Timestamp,
}

impl AnnotationSceneStateRow {
    pub fn media_identifier(&self) -> MediaIdentifier {
        MediaIdentifier {
            media_id: self.media_id,
            frame_index: self.frame_index,
        }
    }

    pub fn to_state(&self) -> AnnotationSceneState {
        AnnotationSceneState {
            media_identifier: self.media_identifier(),
            annotation_scene_id: self.annotation_scene_id,
            state_per_task: self.state_per_task.0.clone(),
            unannotated_rois: self.unannotated_rois.0.clone(),
        }
    }
}

/// Number of media (or video frames) of a dataset storage in each state
/// for one task, counting only the latest state of each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationStateCounts {
    pub none: i64,
    pub partially_annotated: i64,
    pub annotated: i64,
}

impl AnnotationStateCounts {
    pub fn total(&self) -> i64 {
        self.none + self.partially_annotated + self.annotated
    }
}
