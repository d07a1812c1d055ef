//! Parameter schemas: the types whose default trees get persisted.

use super::parameter::ParameterGroup;

/// A named parameter schema able to produce its default tree.
///
/// Implementors stand in for the configuration "data type" of a record:
/// the defaults are rebuilt from code on every read and stored values are
/// substituted into them. Schemas are shared across worker threads.
pub trait ParameterSchema: Send + Sync {
    /// Stable name persisted next to the record.
    fn schema_name(&self) -> &'static str;

    /// A fresh tree holding default values.
    fn default_parameters(&self) -> ParameterGroup;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset_counter_config::DatasetCounterSchema;
    use crate::hyper_parameters::TrainingHyperParameterSchema;
    use crate::task::TaskType;

    fn assert_shareable<T: ?Sized + Send + Sync>(_: &T) {}

    #[test]
    fn schema_objects_are_shareable_across_threads() {
        let schemas: [&dyn ParameterSchema; 2] = [
            &DatasetCounterSchema::new(TaskType::Detection),
            &TrainingHyperParameterSchema,
        ];
        for schema in schemas {
            assert_shareable(schema);
            let name = schema.schema_name();
            let handle = std::thread::scope(|s| s.spawn(|| schema.default_parameters()).join());
            assert!(handle.is_ok(), "{name} defaults built on another thread");
        }
    }
}
