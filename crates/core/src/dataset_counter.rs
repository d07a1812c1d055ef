//! Per-task dataset counters and the missing-annotations report.
//!
//! Counters are updated incrementally from dataset mutation events; the
//! report is always derived from the current counters on demand and is
//! never stored.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dataset_counter_config::DatasetCounterConfig;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A dataset item and the labels its annotation carries for the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetItemLabels {
    pub item_id: DbId,
    pub label_ids: Vec<DbId>,
}

impl DatasetItemLabels {
    pub fn new(item_id: DbId, label_ids: Vec<DbId>) -> Self {
        Self { item_id, label_ids }
    }

    fn distinct_labels(&self) -> BTreeSet<DbId> {
        self.label_ids.iter().copied().collect()
    }
}

/// One batch of changes to a task's working dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetUpdate {
    /// Newly annotated items.
    #[serde(default)]
    pub new_items: Vec<DatasetItemLabels>,
    /// Items removed from the dataset.
    #[serde(default)]
    pub deleted_items: Vec<DatasetItemLabels>,
    /// Existing items assigned to the dataset from elsewhere (e.g. an
    /// upstream task of a chain).
    #[serde(default)]
    pub assigned_items: Vec<DatasetItemLabels>,
}

impl DatasetUpdate {
    pub fn is_empty(&self) -> bool {
        self.new_items.is_empty() && self.deleted_items.is_empty() && self.assigned_items.is_empty()
    }
}

/// A label of the task's current label schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLabel {
    pub id: DbId,
    pub name: String,
    pub is_empty: bool,
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Dataset size and annotated-item count per label of one task.
///
/// `counted_items` records the labels each counted item contributed, so
/// every item is counted at most once whatever the delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetCounterState {
    pub dataset_size: i64,
    #[serde(default)]
    pub label_counts: BTreeMap<DbId, i64>,
    #[serde(default)]
    pub counted_items: BTreeMap<DbId, Vec<DbId>>,
}

impl DatasetCounterState {
    /// Apply one update.
    ///
    /// Adding an item that is already counted replaces its labels without
    /// growing the dataset. Deleting subtracts the labels the item was
    /// counted with; deleting an item that was never counted is a no-op.
    pub fn apply_update(&mut self, update: &DatasetUpdate) {
        for item in update.new_items.iter().chain(&update.assigned_items) {
            let labels: Vec<DbId> = item.distinct_labels().into_iter().collect();
            match self.counted_items.insert(item.item_id, labels.clone()) {
                Some(previous) => self.release_labels(&previous),
                None => self.dataset_size += 1,
            }
            for label in labels {
                *self.label_counts.entry(label).or_insert(0) += 1;
            }
        }
        for item in &update.deleted_items {
            if let Some(previous) = self.counted_items.remove(&item.item_id) {
                self.dataset_size = (self.dataset_size - 1).max(0);
                self.release_labels(&previous);
            }
        }
        self.label_counts.retain(|_, count| *count > 0);
    }

    fn release_labels(&mut self, labels: &[DbId]) {
        for label in labels {
            if let Some(count) = self.label_counts.get_mut(label) {
                *count = (*count - 1).max(0);
            }
        }
    }

    /// Drop counters of labels no longer in the schema. Returns how many
    /// counters were removed.
    pub fn retain_labels(&mut self, label_ids: &[DbId]) -> usize {
        let before = self.label_counts.len();
        self.label_counts.retain(|label, _| label_ids.contains(label));
        for labels in self.counted_items.values_mut() {
            labels.retain(|label| label_ids.contains(label));
        }
        before - self.label_counts.len()
    }

    pub fn is_counted(&self, item_id: DbId) -> bool {
        self.counted_items.contains_key(&item_id)
    }

    pub fn count_for_label(&self, label_id: DbId) -> i64 {
        self.label_counts.get(&label_id).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// How many annotations are still missing before a task can be trained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissingAnnotationsReport {
    pub total_missing_manual_training: i64,
    pub total_missing_auto_training: i64,
    pub missing_per_label: BTreeMap<DbId, i64>,
}

impl MissingAnnotationsReport {
    pub fn is_ready_for_manual_training(&self) -> bool {
        self.total_missing_manual_training == 0
    }

    pub fn is_ready_for_auto_training(&self) -> bool {
        self.total_missing_auto_training == 0 && self.missing_per_label.values().all(|m| *m == 0)
    }
}

/// Everything the report is derived from.
#[derive(Debug, Clone, Copy)]
pub struct MissingAnnotationsInput<'a> {
    pub config: &'a DatasetCounterConfig,
    pub counters: &'a DatasetCounterState,
    pub labels: &'a [TaskLabel],
    pub has_trained_model: bool,
    /// Last value computed by the dynamic required annotations formula.
    pub dynamic_required_annotations: Option<i64>,
}

/// Annotations needed before the next automatic training round.
pub fn required_for_auto_training(config: &DatasetCounterConfig, dynamic: Option<i64>) -> i64 {
    match dynamic {
        Some(required) if config.use_dynamic_required_annotations => required,
        _ => config.required_images_auto_training,
    }
}

/// Derive the missing-annotations report from the current counters.
///
/// The per-label constraint only applies before the first model of the
/// task exists; afterwards `missing_per_label` is always empty. Empty
/// labels never get a per-label requirement.
pub fn compute_missing_annotations(input: MissingAnnotationsInput<'_>) -> MissingAnnotationsReport {
    let config = input.config;
    let dataset_size = input.counters.dataset_size;
    let required_auto = required_for_auto_training(config, input.dynamic_required_annotations);

    let mut missing_per_label = BTreeMap::new();
    if config.label_constraint_first_training && !input.has_trained_model {
        for label in input.labels.iter().filter(|l| !l.is_empty) {
            let missing =
                (config.minimum_annotations_per_label - input.counters.count_for_label(label.id)).max(0);
            missing_per_label.insert(label.id, missing);
        }
    }

    MissingAnnotationsReport {
        total_missing_manual_training: (config.minimum_annotations_manual_training - dataset_size).max(0),
        total_missing_auto_training: (required_auto - dataset_size).max(0),
        missing_per_label,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(required: i64, label_constraint: bool, dynamic: bool) -> DatasetCounterConfig {
        DatasetCounterConfig {
            required_images_auto_training: required,
            label_constraint_first_training: label_constraint,
            use_dynamic_required_annotations: dynamic,
            ..DatasetCounterConfig::default()
        }
    }

    fn labels() -> Vec<TaskLabel> {
        vec![
            TaskLabel { id: 1, name: "cat".into(), is_empty: false },
            TaskLabel { id: 2, name: "dog".into(), is_empty: false },
            TaskLabel { id: 3, name: "No object".into(), is_empty: true },
        ]
    }

    fn item(id: DbId, labels: &[DbId]) -> DatasetItemLabels {
        DatasetItemLabels::new(id, labels.to_vec())
    }

    fn report(
        config: &DatasetCounterConfig,
        counters: &DatasetCounterState,
        has_trained_model: bool,
        dynamic: Option<i64>,
    ) -> MissingAnnotationsReport {
        let labels = labels();
        compute_missing_annotations(MissingAnnotationsInput {
            config,
            counters,
            labels: &labels,
            has_trained_model,
            dynamic_required_annotations: dynamic,
        })
    }

    // -- Counters ---------------------------------------------------------------

    #[test]
    fn new_and_assigned_items_increment() {
        let mut state = DatasetCounterState::default();
        state.apply_update(&DatasetUpdate {
            new_items: vec![item(1, &[1]), item(2, &[1, 2])],
            assigned_items: vec![item(3, &[2])],
            ..Default::default()
        });
        assert_eq!(state.dataset_size, 3);
        assert_eq!(state.count_for_label(1), 2);
        assert_eq!(state.count_for_label(2), 2);
    }

    #[test]
    fn duplicate_labels_in_one_item_count_once() {
        let mut state = DatasetCounterState::default();
        state.apply_update(&DatasetUpdate {
            new_items: vec![item(1, &[1, 1, 1])],
            ..Default::default()
        });
        assert_eq!(state.count_for_label(1), 1);
    }

    #[test]
    fn deleting_uncounted_item_changes_nothing() {
        let mut state = DatasetCounterState::default();
        state.apply_update(&DatasetUpdate {
            new_items: vec![item(1, &[1])],
            ..Default::default()
        });
        state.apply_update(&DatasetUpdate {
            deleted_items: vec![item(1, &[1]), item(2, &[1, 2])],
            ..Default::default()
        });
        assert_eq!(state.dataset_size, 0);
        assert_eq!(state.count_for_label(1), 0);
        assert!(state.label_counts.is_empty());

        state.apply_update(&DatasetUpdate {
            deleted_items: vec![item(3, &[1])],
            ..Default::default()
        });
        assert_eq!(state, DatasetCounterState::default());
    }

    #[test]
    fn redelivered_update_counts_items_once() {
        let update = DatasetUpdate {
            new_items: vec![item(7, &[1])],
            ..Default::default()
        };
        let mut state = DatasetCounterState::default();
        state.apply_update(&update);
        state.apply_update(&update);
        assert_eq!(state.dataset_size, 1);
        assert_eq!(state.count_for_label(1), 1);
        assert!(state.is_counted(7));
    }

    #[test]
    fn reannotated_item_replaces_its_labels() {
        let mut state = DatasetCounterState::default();
        state.apply_update(&DatasetUpdate {
            new_items: vec![item(7, &[1, 2])],
            ..Default::default()
        });
        state.apply_update(&DatasetUpdate {
            assigned_items: vec![item(7, &[2, 3])],
            ..Default::default()
        });
        assert_eq!(state.dataset_size, 1);
        assert_eq!(state.count_for_label(1), 0);
        assert_eq!(state.count_for_label(2), 1);
        assert_eq!(state.count_for_label(3), 1);
    }

    #[test]
    fn deletion_uses_labels_the_item_was_counted_with() {
        let mut state = DatasetCounterState::default();
        state.apply_update(&DatasetUpdate {
            new_items: vec![item(1, &[1]), item(2, &[2])],
            ..Default::default()
        });
        state.apply_update(&DatasetUpdate {
            deleted_items: vec![item(1, &[])],
            ..Default::default()
        });
        assert_eq!(state.dataset_size, 1);
        assert_eq!(state.count_for_label(1), 0);
        assert_eq!(state.count_for_label(2), 1);
        assert!(!state.is_counted(1));
    }

    #[test]
    fn retain_labels_drops_stale_counters() {
        let mut state = DatasetCounterState::default();
        state.apply_update(&DatasetUpdate {
            new_items: vec![item(1, &[1, 2])],
            ..Default::default()
        });
        assert_eq!(state.retain_labels(&[2]), 1);
        assert_eq!(state.count_for_label(1), 0);
        assert_eq!(state.count_for_label(2), 1);
        assert_eq!(state.counted_items[&1], vec![2]);
    }

    // -- Report -----------------------------------------------------------------

    #[test]
    fn fresh_task_reports_full_requirements() {
        let cfg = config(10, false, false);
        let r = report(&cfg, &DatasetCounterState::default(), false, None);
        assert_eq!(r.total_missing_auto_training, 10);
        assert_eq!(r.total_missing_manual_training, 3);
        assert!(r.missing_per_label.is_empty());
        assert!(!r.is_ready_for_manual_training());
    }

    #[test]
    fn adding_items_decreases_missing_counts() {
        let cfg = config(10, false, false);
        let mut counters = DatasetCounterState::default();
        counters.apply_update(&DatasetUpdate {
            new_items: vec![item(1, &[1]), item(2, &[2])],
            ..Default::default()
        });
        let r = report(&cfg, &counters, false, None);
        assert_eq!(r.total_missing_auto_training, 8);
        assert_eq!(r.total_missing_manual_training, 1);

        counters.apply_update(&DatasetUpdate {
            new_items: vec![item(3, &[1]), item(4, &[1])],
            ..Default::default()
        });
        let r = report(&cfg, &counters, false, None);
        assert_eq!(r.total_missing_manual_training, 0);
        assert!(r.is_ready_for_manual_training());
    }

    #[test]
    fn label_constraint_before_first_training() {
        let cfg = config(10, true, false);
        let mut counters = DatasetCounterState::default();
        counters.apply_update(&DatasetUpdate {
            new_items: vec![item(1, &[1]), item(2, &[1])],
            ..Default::default()
        });
        let r = report(&cfg, &counters, false, None);
        assert_eq!(r.missing_per_label.get(&1), Some(&8));
        assert_eq!(r.missing_per_label.get(&2), Some(&10));
        assert!(!r.missing_per_label.contains_key(&3));
        assert!(!r.is_ready_for_auto_training());
    }

    #[test]
    fn label_constraint_dropped_after_first_model() {
        let cfg = config(10, true, false);
        let r = report(&cfg, &DatasetCounterState::default(), true, None);
        assert!(r.missing_per_label.is_empty());
    }

    #[test]
    fn stale_label_counters_do_not_contribute() {
        let cfg = config(10, true, false);
        let mut counters = DatasetCounterState::default();
        counters.label_counts.insert(42, 100);
        let r = report(&cfg, &counters, false, None);
        assert!(!r.missing_per_label.contains_key(&42));
    }

    #[test]
    fn dynamic_value_used_only_when_enabled() {
        let counters = DatasetCounterState::default();
        let r = report(&config(10, false, true), &counters, true, Some(25));
        assert_eq!(r.total_missing_auto_training, 25);
        let r = report(&config(10, false, false), &counters, true, Some(25));
        assert_eq!(r.total_missing_auto_training, 10);
        let r = report(&config(10, false, true), &counters, false, None);
        assert_eq!(r.total_missing_auto_training, 10);
    }

    #[test]
    fn update_payload_defaults_missing_lists() {
        let update: DatasetUpdate =
            serde_json::from_value(serde_json::json!({"new_items": [{"item_id": 1, "label_ids": [2]}]}))
                .unwrap();
        assert_eq!(update.new_items.len(), 1);
        assert!(update.deleted_items.is_empty());
        assert!(!update.is_empty());
    }
}
