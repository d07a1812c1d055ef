//! Task types of a project pipeline.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of computer-vision task a pipeline node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Classification,
    Detection,
    RotatedDetection,
    Segmentation,
    InstanceSegmentation,
    AnomalyClassification,
    AnomalyDetection,
    AnomalySegmentation,
    KeypointDetection,
}

/// All valid task type strings.
pub const VALID_TASK_TYPES: &[&str] = &[
    "classification",
    "detection",
    "rotated_detection",
    "segmentation",
    "instance_segmentation",
    "anomaly_classification",
    "anomaly_detection",
    "anomaly_segmentation",
    "keypoint_detection",
];

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Detection => "detection",
            Self::RotatedDetection => "rotated_detection",
            Self::Segmentation => "segmentation",
            Self::InstanceSegmentation => "instance_segmentation",
            Self::AnomalyClassification => "anomaly_classification",
            Self::AnomalyDetection => "anomaly_detection",
            Self::AnomalySegmentation => "anomaly_segmentation",
            Self::KeypointDetection => "keypoint_detection",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        VALID_TASK_TYPES
            .iter()
            .position(|t| *t == s)
            .map(|i| Self::ALL[i])
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid task type '{s}'. Must be one of: {}",
                    VALID_TASK_TYPES.join(", ")
                ))
            })
    }

    /// Same order as [`VALID_TASK_TYPES`].
    pub const ALL: [TaskType; 9] = [
        Self::Classification,
        Self::Detection,
        Self::RotatedDetection,
        Self::Segmentation,
        Self::InstanceSegmentation,
        Self::AnomalyClassification,
        Self::AnomalyDetection,
        Self::AnomalySegmentation,
        Self::KeypointDetection,
    ];

    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            Self::AnomalyClassification | Self::AnomalyDetection | Self::AnomalySegmentation
        )
    }
}
