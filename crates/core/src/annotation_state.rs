//! Annotation state of media per pipeline task.
//!
//! A media item moves `NONE -> PARTIALLY_ANNOTATED -> ANNOTATED` per task as
//! annotations are saved. Going back to `NONE` is only possible by deleting
//! every annotation of the media. States are kept as history: the most
//! recently saved state of an annotation scene is authoritative.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const STATE_NONE: &str = "none";
pub const STATE_PARTIALLY_ANNOTATED: &str = "partially_annotated";
pub const STATE_ANNOTATED: &str = "annotated";

/// All valid annotation state strings.
pub const VALID_ANNOTATION_STATES: &[&str] = &[STATE_NONE, STATE_PARTIALLY_ANNOTATED, STATE_ANNOTATED];

// ---------------------------------------------------------------------------
// AnnotationState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationState {
    #[default]
    None,
    PartiallyAnnotated,
    Annotated,
}

impl AnnotationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => STATE_NONE,
            Self::PartiallyAnnotated => STATE_PARTIALLY_ANNOTATED,
            Self::Annotated => STATE_ANNOTATED,
        }
    }

    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            STATE_NONE => Ok(Self::None),
            STATE_PARTIALLY_ANNOTATED => Ok(Self::PartiallyAnnotated),
            STATE_ANNOTATED => Ok(Self::Annotated),
            _ => Err(CoreError::Validation(format!(
                "Invalid annotation state '{s}'. Must be one of: {}",
                VALID_ANNOTATION_STATES.join(", ")
            ))),
        }
    }

    /// Derive a task's state from how many of its regions of interest exist
    /// and how many of them still lack annotations.
    pub fn from_rois(total_rois: usize, unannotated_rois: usize) -> Self {
        if total_rois == 0 || unannotated_rois >= total_rois {
            Self::None
        } else if unannotated_rois == 0 {
            Self::Annotated
        } else {
            Self::PartiallyAnnotated
        }
    }

    /// Validate a transition to `next`.
    ///
    /// Every move is allowed except back to `NONE`, which requires that all
    /// annotations of the media were deleted.
    pub fn transition(self, next: Self, annotations_deleted: bool) -> Result<Self, CoreError> {
        if next == Self::None && self != Self::None && !annotations_deleted {
            return Err(CoreError::Conflict(format!(
                "Cannot move annotation state from '{}' to '{}' without deleting the annotations",
                self.as_str(),
                next.as_str()
            )));
        }
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// AnnotationSceneState
// ---------------------------------------------------------------------------

/// Identifies an image or one frame of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaIdentifier {
    pub media_id: DbId,
    pub frame_index: Option<i64>,
}

impl MediaIdentifier {
    pub fn image(media_id: DbId) -> Self {
        Self {
            media_id,
            frame_index: None,
        }
    }

    pub fn video_frame(media_id: DbId, frame_index: i64) -> Self {
        Self {
            media_id,
            frame_index: Some(frame_index),
        }
    }
}

/// Regions of interest of one task in an annotation scene.
#[derive(Debug, Clone)]
pub struct TaskRois {
    pub task_id: DbId,
    pub total_rois: usize,
    pub unannotated_roi_ids: Vec<DbId>,
}

/// Per-task annotation state of one annotation scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSceneState {
    pub media_identifier: MediaIdentifier,
    pub annotation_scene_id: DbId,
    pub state_per_task: BTreeMap<DbId, AnnotationState>,
    pub unannotated_rois: BTreeMap<DbId, Vec<DbId>>,
}

impl AnnotationSceneState {
    /// Build a state from the regions of interest of every task.
    pub fn from_task_rois(
        media_identifier: MediaIdentifier,
        annotation_scene_id: DbId,
        tasks: &[TaskRois],
    ) -> Self {
        let mut state_per_task = BTreeMap::new();
        let mut unannotated_rois = BTreeMap::new();
        for task in tasks {
            state_per_task.insert(
                task.task_id,
                AnnotationState::from_rois(task.total_rois, task.unannotated_roi_ids.len()),
            );
            if !task.unannotated_roi_ids.is_empty() {
                unannotated_rois.insert(task.task_id, task.unannotated_roi_ids.clone());
            }
        }
        Self {
            media_identifier,
            annotation_scene_id,
            state_per_task,
            unannotated_rois,
        }
    }

    pub fn state_for_task(&self, task_id: DbId) -> AnnotationState {
        self.state_per_task.get(&task_id).copied().unwrap_or_default()
    }

    pub fn is_annotated_for_task(&self, task_id: DbId) -> bool {
        self.state_for_task(task_id) == AnnotationState::Annotated
    }

    /// State of the media across all tasks.
    pub fn overall_state(&self) -> AnnotationState {
        let states: Vec<AnnotationState> = self.state_per_task.values().copied().collect();
        if states.is_empty() || states.iter().all(|s| *s == AnnotationState::None) {
            AnnotationState::None
        } else if states.iter().all(|s| *s == AnnotationState::Annotated) {
            AnnotationState::Annotated
        } else {
            AnnotationState::PartiallyAnnotated
        }
    }

    /// Check every task transition from `previous` to `self`.
    pub fn validate_transition(
        &self,
        previous: Option<&AnnotationSceneState>,
        annotations_deleted: bool,
    ) -> Result<(), CoreError> {
        let Some(previous) = previous else {
            return Ok(());
        };
        for (task_id, before) in &previous.state_per_task {
            before.transition(self.state_for_task(*task_id), annotations_deleted)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
