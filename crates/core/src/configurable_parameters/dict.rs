//! Conversion between parameter trees and their dict (JSON object) form.
//!
//! This is the representation persisted in configuration records and
//! exchanged with model templates:
//!
//! ```json
//! {
//!   "type": "PARAMETER_GROUP",
//!   "header": "Dataset",
//!   "description": "",
//!   "required_images_auto_training": {
//!     "type": "INTEGER", "value": 12, "default_value": 12,
//!     "min_value": 3, "max_value": 10000, ...
//!   }
//! }
//! ```

use serde_json::{Map, Value};

use super::parameter::{
    ModelLifecycle, Parameter, ParameterGroup, ParameterKind, ParameterNode, SelectableOption,
    TYPE_BOOLEAN, TYPE_FLOAT, TYPE_GROUP, TYPE_INTEGER, TYPE_SELECTABLE, TYPE_STRING,
    VALID_PARAMETER_TYPES,
};
use crate::error::CoreError;

/// Keys carrying group metadata rather than children.
pub const RESERVED_GROUP_KEYS: &[&str] = &["type", "header", "description"];

impl ParameterGroup {
    /// Serialize the tree, including metadata and constraints.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::from(TYPE_GROUP));
        obj.insert("header".into(), Value::from(self.header.clone()));
        obj.insert("description".into(), Value::from(self.description.clone()));
        for (name, node) in &self.children {
            let child = match node {
                ParameterNode::Group(g) => g.to_json(),
                ParameterNode::Parameter(p) => p.to_json(),
            };
            obj.insert(name.clone(), child);
        }
        Value::Object(obj)
    }

    /// Parse a tree from its dict form. The result is validated.
    pub fn from_json(json: &Value) -> Result<Self, CoreError> {
        let group = parse_group(json, "")?;
        group.validate()?;
        Ok(group)
    }
}

impl Parameter {
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), Value::from(self.kind.type_name()));
        obj.insert("value".into(), self.kind.value_json());
        obj.insert("default_value".into(), self.kind.default_json());
        match &self.kind {
            ParameterKind::Integer {
                min_value,
                max_value,
                ..
            } => {
                obj.insert("min_value".into(), Value::from(*min_value));
                obj.insert("max_value".into(), Value::from(*max_value));
            }
            ParameterKind::Float {
                min_value,
                max_value,
                ..
            } => {
                obj.insert("min_value".into(), Value::from(*min_value));
                obj.insert("max_value".into(), Value::from(*max_value));
            }
            ParameterKind::Selectable { options, .. } => {
                let options: Vec<Value> = options
                    .iter()
                    .map(|o| serde_json::json!({"name": o.name, "value": o.value}))
                    .collect();
                obj.insert("options".into(), Value::Array(options));
            }
            ParameterKind::Boolean { .. } | ParameterKind::String { .. } => {}
        }
        obj.insert("header".into(), Value::from(self.header.clone()));
        obj.insert("description".into(), Value::from(self.description.clone()));
        obj.insert(
            "affects_outcome_of".into(),
            Value::from(self.affects_outcome_of.as_str()),
        );
        obj.insert("editable".into(), Value::from(self.editable));
        obj.insert("visible_in_ui".into(), Value::from(self.visible_in_ui));
        obj.insert(
            "warning".into(),
            self.warning.clone().map(Value::from).unwrap_or(Value::Null),
        );
        if let Some(rules) = &self.ui_rules {
            obj.insert("ui_rules".into(), rules.clone());
        }
        Value::Object(obj)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn invalid(path: &str, msg: &str) -> CoreError {
    let at = if path.is_empty() { "<root>" } else { path };
    CoreError::Validation(format!("{at}: {msg}"))
}

fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parse_group(json: &Value, path: &str) -> Result<ParameterGroup, CoreError> {
    let obj = json
        .as_object()
        .ok_or_else(|| invalid(path, "parameter group must be a JSON object"))?;

    let mut group = ParameterGroup::new(str_field(obj, "header"))
        .with_description(str_field(obj, "description"));

    for (name, value) in obj {
        if RESERVED_GROUP_KEYS.contains(&name.as_str()) {
            continue;
        }
        // Non-object entries are extra metadata (e.g. "visible_in_ui").
        let Some(child) = value.as_object() else {
            continue;
        };
        let path = child_path(path, name);
        let node = match child.get("type").and_then(Value::as_str) {
            Some(TYPE_GROUP) => ParameterNode::Group(parse_group(value, &path)?),
            Some(_) => ParameterNode::Parameter(parse_parameter(child, &path)?),
            None => return Err(invalid(&path, "node is missing its 'type'")),
        };
        group.children.insert(name.clone(), node);
    }
    Ok(group)
}

fn parse_parameter(obj: &Map<String, Value>, path: &str) -> Result<Parameter, CoreError> {
    let type_name = obj.get("type").and_then(Value::as_str).unwrap_or_default();

    let int = |key: &str| {
        obj.get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| invalid(path, &format!("'{key}' must be an integer")))
    };
    let float = |key: &str| {
        obj.get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| invalid(path, &format!("'{key}' must be a number")))
    };
    let boolean = |key: &str| {
        obj.get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid(path, &format!("'{key}' must be a boolean")))
    };
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| invalid(path, &format!("'{key}' must be a string")))
    };

    let kind = match type_name {
        TYPE_INTEGER => {
            let default_value = int("default_value")?;
            ParameterKind::Integer {
                value: obj.get("value").map_or(Ok(default_value), |_| int("value"))?,
                default_value,
                min_value: int("min_value")?,
                max_value: int("max_value")?,
            }
        }
        TYPE_FLOAT => {
            let default_value = float("default_value")?;
            ParameterKind::Float {
                value: obj.get("value").map_or(Ok(default_value), |_| float("value"))?,
                default_value,
                min_value: float("min_value")?,
                max_value: float("max_value")?,
            }
        }
        TYPE_BOOLEAN => {
            let default_value = boolean("default_value")?;
            ParameterKind::Boolean {
                value: obj.get("value").map_or(Ok(default_value), |_| boolean("value"))?,
                default_value,
            }
        }
        TYPE_STRING => {
            let default_value = text("default_value")?;
            ParameterKind::String {
                value: obj
                    .get("value")
                    .map_or(Ok(default_value.clone()), |_| text("value"))?,
                default_value,
            }
        }
        TYPE_SELECTABLE => {
            let options: Vec<SelectableOption> = obj
                .get("options")
                .cloned()
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| invalid(path, &format!("invalid 'options': {e}")))?
                .unwrap_or_default();
            if options.is_empty() {
                return Err(invalid(path, "selectable parameter needs at least one option"));
            }
            let default_value = text("default_value")?;
            ParameterKind::Selectable {
                value: obj
                    .get("value")
                    .map_or(Ok(default_value.clone()), |_| text("value"))?,
                default_value,
                options,
            }
        }
        other => {
            return Err(invalid(
                path,
                &format!(
                    "unknown parameter type '{other}'. Must be one of: {}",
                    VALID_PARAMETER_TYPES.join(", ")
                ),
            ))
        }
    };

    let affects_outcome_of = match obj.get("affects_outcome_of").and_then(Value::as_str) {
        Some(s) => ModelLifecycle::parse(s)?,
        None => ModelLifecycle::None,
    };

    Ok(Parameter {
        header: str_field(obj, "header"),
        description: str_field(obj, "description"),
        affects_outcome_of,
        editable: obj.get("editable").and_then(Value::as_bool).unwrap_or(true),
        visible_in_ui: obj
            .get("visible_in_ui")
            .and_then(Value::as_bool)
            .unwrap_or(true),
        warning: obj.get("warning").and_then(Value::as_str).map(String::from),
        ui_rules: obj.get("ui_rules").filter(|v| !v.is_null()).cloned(),
        kind,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
