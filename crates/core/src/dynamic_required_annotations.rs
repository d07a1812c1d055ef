//! Performance-driven threshold for the next automatic training round.
//!
//! Assuming error shrinks geometrically with dataset size, the number of
//! extra images needed to lift performance by 10% (capped at 0.9999) is
//! `(log(1 - target) / log(1 - current) - 1) * dataset_count`.

use serde::{Deserialize, Serialize};

/// Relative improvement targeted by the next training round.
pub const PERFORMANCE_IMPROVEMENT_FACTOR: f64 = 1.1;

/// Upper bound for the targeted performance.
pub const MAX_TARGET_PERFORMANCE: f64 = 0.9999;

/// The formula never asks for fewer images than this.
pub const MIN_DYNAMIC_REQUIRED_IMAGES: i64 = 12;

/// Score of a trained model and the size of the dataset it was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub performance: Option<f64>,
    pub dataset_count: i64,
}

/// Number of new images required before the next automatic training.
///
/// - `current_performance >= 1.0`: the current dataset size.
/// - `current_performance == 0.0` (or not a valid score): `configured_default`;
///   such a model carries no signal.
/// - otherwise: the formula result, at least [`MIN_DYNAMIC_REQUIRED_IMAGES`].
pub fn calculate_required_num_images(
    current_performance: f64,
    dataset_count: i64,
    configured_default: i64,
) -> i64 {
    if current_performance >= 1.0 {
        return dataset_count;
    }
    if current_performance.is_nan() || current_performance <= 0.0 {
        return configured_default;
    }

    let target = (current_performance * PERFORMANCE_IMPROVEMENT_FACTOR).min(MAX_TARGET_PERFORMANCE);
    let ratio = (1.0 - target).ln() / (1.0 - current_performance).ln();
    let required = ((ratio - 1.0) * dataset_count as f64).ceil() as i64;
    required.max(MIN_DYNAMIC_REQUIRED_IMAGES)
}

/// Dynamic requirement for the latest model, or `None` when there is no
/// model or no recorded performance; callers then use the static default.
pub fn dynamic_required_annotations(
    latest: Option<ModelPerformance>,
    configured_default: i64,
) -> Option<i64> {
    let latest = latest?;
    let performance = latest.performance?;
    Some(calculate_required_num_images(
        performance,
        latest.dataset_count,
        configured_default,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_performance_on_ninety_images() {
        assert_eq!(calculate_required_num_images(0.5, 90, 12), 14);
    }

    #[test]
    fn calculation_is_deterministic() {
        let first = calculate_required_num_images(0.5, 90, 12);
        for _ in 0..10 {
            assert_eq!(calculate_required_num_images(0.5, 90, 12), first);
        }
    }

    #[test]
    fn target_is_capped() {
        // 0.95 * 1.1 exceeds the cap, so the target is 0.9999.
        assert_eq!(calculate_required_num_images(0.95, 100, 12), 208);
    }

    #[test]
    fn mid_range_performance() {
        assert_eq!(calculate_required_num_images(0.8, 50, 12), 16);
    }

    #[test]
    fn small_result_is_floored() {
        assert_eq!(calculate_required_num_images(0.1, 10, 12), MIN_DYNAMIC_REQUIRED_IMAGES);
    }

    #[test]
    fn perfect_performance_matches_dataset_count() {
        assert_eq!(calculate_required_num_images(1.0, 90, 12), 90);
        assert_eq!(calculate_required_num_images(1.0, 3, 12), 3);
    }

    #[test]
    fn zero_performance_keeps_configured_default() {
        assert_eq!(calculate_required_num_images(0.0, 90, 20), 20);
        assert_eq!(calculate_required_num_images(f64::NAN, 90, 20), 20);
        assert_eq!(calculate_required_num_images(-0.3, 90, 20), 20);
    }

    #[test]
    fn missing_model_or_score_yields_none() {
        assert_eq!(dynamic_required_annotations(None, 12), None);
        assert_eq!(
            dynamic_required_annotations(
                Some(ModelPerformance { performance: None, dataset_count: 50 }),
                12
            ),
            None
        );
        assert_eq!(
            dynamic_required_annotations(
                Some(ModelPerformance { performance: Some(0.5), dataset_count: 90 }),
                12
            ),
            Some(14)
        );
    }
}
