//! In-place value substitution into a parameter tree.
//!
//! The source is any nested JSON object. Every object that holds a
//! `"value"` key contributes one `(path, value)` pair, where the path is the
//! chain of keys leading to that object. Pairs under a `ui_rules` key are
//! presentation rules and are ignored.

use serde_json::Value;

use super::parameter::{ModelLifecycle, ParameterGroup, ParameterNode};
use crate::error::CoreError;

pub const VALUE_KEY: &str = "value";
pub const UI_RULES_KEY: &str = "ui_rules";

/// Controls how [`substitute_values`] treats mismatches and lifecycles.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionOptions {
    /// Skip source values whose path does not exist in the target instead
    /// of failing. Schema-evolution reads set this.
    pub allow_missing_values: bool,
    /// Only apply values to leaves whose `affects_outcome_of` is listed.
    pub lifecycle_filter: Option<Vec<ModelLifecycle>>,
}

impl SubstitutionOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn allow_missing() -> Self {
        Self {
            allow_missing_values: true,
            lifecycle_filter: None,
        }
    }

    pub fn with_lifecycles(mut self, lifecycles: Vec<ModelLifecycle>) -> Self {
        self.lifecycle_filter = Some(lifecycles);
        self
    }
}

/// Collect every `"value"` entry of `node` together with its key path.
fn collect_values<'a>(node: &'a Value, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, &'a Value)>) {
    let Value::Object(obj) = node else {
        return;
    };
    for (key, child) in obj {
        if key == VALUE_KEY {
            out.push((path.clone(), child));
        } else if child.is_object() {
            path.push(key.clone());
            collect_values(child, path, out);
            path.pop();
        }
    }
}

/// Check that `path` leads through groups to a leaf of `target`.
fn check_path(target: &ParameterGroup, path: &[String]) -> Result<(), CoreError> {
    let mismatch = |segment: &str| CoreError::StructureMismatch {
        path: path.join("."),
        segment: segment.to_string(),
    };
    let Some((last, parents)) = path.split_last() else {
        return Err(mismatch(VALUE_KEY));
    };

    let mut group = target;
    for segment in parents {
        match group.children.get(segment) {
            Some(ParameterNode::Group(g)) => group = g,
            _ => return Err(mismatch(segment)),
        }
    }
    match group.children.get(last) {
        Some(ParameterNode::Parameter(_)) => Ok(()),
        _ => Err(mismatch(last)),
    }
}

/// Substitute the values found in `source` into `target`.
///
/// All paths are resolved before anything is written, so a structure
/// mismatch leaves `target` untouched. Each leaf is type- and bounds-checked
/// before assignment; rejected leaves keep their previous value and all
/// rejections are reported together as one [`CoreError::Validation`].
pub fn substitute_values(
    target: &mut ParameterGroup,
    source: &Value,
    options: &SubstitutionOptions,
) -> Result<(), CoreError> {
    let mut found = Vec::new();
    collect_values(source, &mut Vec::new(), &mut found);

    let mut applicable = Vec::with_capacity(found.len());
    for (path, value) in found {
        if path.iter().any(|segment| segment == UI_RULES_KEY) {
            continue;
        }
        match check_path(target, &path) {
            Ok(()) => applicable.push((path, value)),
            Err(_) if options.allow_missing_values => continue,
            Err(e) => return Err(e),
        }
    }

    let mut errors = Vec::new();
    for (path, value) in applicable {
        let segments: Vec<&str> = path.iter().map(String::as_str).collect();
        let Some(parameter) = target.parameter_mut(&segments) else {
            continue;
        };
        if let Some(filter) = &options.lifecycle_filter {
            if !filter.contains(&parameter.affects_outcome_of) {
                continue;
            }
        }
        if let Err(msg) = parameter.set_value(&path.join("."), value) {
            errors.push(msg);
        }
    }

    if !errors.is_empty() {
        return Err(CoreError::Validation(errors.join("; ")));
    }
    target.validate()
}

/// Substitute the values of another tree into `target`.
pub fn substitute_from_tree(
    target: &mut ParameterGroup,
    source: &ParameterGroup,
    options: &SubstitutionOptions,
) -> Result<(), CoreError> {
    substitute_values(target, &source.to_json(), options)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
