//! Parameter tree node types.
//!
//! A tree is a [`ParameterGroup`] whose ordered children are either nested
//! groups or typed [`Parameter`] leaves. Every leaf carries its own
//! bounds/options and the [`ModelLifecycle`] phase it affects.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TYPE_GROUP: &str = "PARAMETER_GROUP";
pub const TYPE_INTEGER: &str = "INTEGER";
pub const TYPE_FLOAT: &str = "FLOAT";
pub const TYPE_BOOLEAN: &str = "BOOLEAN";
pub const TYPE_STRING: &str = "STRING";
pub const TYPE_SELECTABLE: &str = "SELECTABLE";

/// All valid leaf type strings.
pub const VALID_PARAMETER_TYPES: &[&str] = &[
    TYPE_INTEGER,
    TYPE_FLOAT,
    TYPE_BOOLEAN,
    TYPE_STRING,
    TYPE_SELECTABLE,
];

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Pipeline phase whose outcome a parameter affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelLifecycle {
    None,
    Architecture,
    Training,
    Inference,
    Testing,
}

const VALID_LIFECYCLES: &[&str] = &["NONE", "ARCHITECTURE", "TRAINING", "INFERENCE", "TESTING"];

impl ModelLifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Architecture => "ARCHITECTURE",
            Self::Training => "TRAINING",
            Self::Inference => "INFERENCE",
            Self::Testing => "TESTING",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "NONE" => Ok(Self::None),
            "ARCHITECTURE" => Ok(Self::Architecture),
            "TRAINING" => Ok(Self::Training),
            "INFERENCE" => Ok(Self::Inference),
            "TESTING" => Ok(Self::Testing),
            _ => Err(CoreError::Validation(format!(
                "Invalid model lifecycle '{s}'. Must be one of: {}",
                VALID_LIFECYCLES.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Leaves
// ---------------------------------------------------------------------------

/// One choice of a selectable parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectableOption {
    pub name: String,
    pub value: String,
}

impl SelectableOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Typed payload of a leaf: current value, default, and constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    Integer {
        value: i64,
        default_value: i64,
        min_value: i64,
        max_value: i64,
    },
    Float {
        value: f64,
        default_value: f64,
        min_value: f64,
        max_value: f64,
    },
    Boolean {
        value: bool,
        default_value: bool,
    },
    String {
        value: String,
        default_value: String,
    },
    Selectable {
        value: String,
        default_value: String,
        options: Vec<SelectableOption>,
    },
}

impl ParameterKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer { .. } => TYPE_INTEGER,
            Self::Float { .. } => TYPE_FLOAT,
            Self::Boolean { .. } => TYPE_BOOLEAN,
            Self::String { .. } => TYPE_STRING,
            Self::Selectable { .. } => TYPE_SELECTABLE,
        }
    }

    /// Current value as JSON.
    pub fn value_json(&self) -> Value {
        match self {
            Self::Integer { value, .. } => Value::from(*value),
            Self::Float { value, .. } => Value::from(*value),
            Self::Boolean { value, .. } => Value::from(*value),
            Self::String { value, .. } | Self::Selectable { value, .. } => {
                Value::from(value.clone())
            }
        }
    }

    /// Default value as JSON.
    pub fn default_json(&self) -> Value {
        match self {
            Self::Integer { default_value, .. } => Value::from(*default_value),
            Self::Float { default_value, .. } => Value::from(*default_value),
            Self::Boolean { default_value, .. } => Value::from(*default_value),
            Self::String { default_value, .. } | Self::Selectable { default_value, .. } => {
                Value::from(default_value.clone())
            }
        }
    }
}

/// A typed configurable parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub header: String,
    pub description: String,
    pub affects_outcome_of: ModelLifecycle,
    pub editable: bool,
    pub visible_in_ui: bool,
    pub warning: Option<String>,
    /// Presentation-only rules; never treated as parameter values.
    pub ui_rules: Option<Value>,
    pub kind: ParameterKind,
}

impl Parameter {
    fn with_kind(header: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            header: header.into(),
            description: String::new(),
            affects_outcome_of: ModelLifecycle::None,
            editable: true,
            visible_in_ui: true,
            warning: None,
            ui_rules: None,
            kind,
        }
    }

    pub fn integer(header: impl Into<String>, default_value: i64, min_value: i64, max_value: i64) -> Self {
        Self::with_kind(
            header,
            ParameterKind::Integer {
                value: default_value,
                default_value,
                min_value,
                max_value,
            },
        )
    }

    pub fn float(header: impl Into<String>, default_value: f64, min_value: f64, max_value: f64) -> Self {
        Self::with_kind(
            header,
            ParameterKind::Float {
                value: default_value,
                default_value,
                min_value,
                max_value,
            },
        )
    }

    pub fn boolean(header: impl Into<String>, default_value: bool) -> Self {
        Self::with_kind(
            header,
            ParameterKind::Boolean {
                value: default_value,
                default_value,
            },
        )
    }

    pub fn string(header: impl Into<String>, default_value: impl Into<String>) -> Self {
        let default_value = default_value.into();
        Self::with_kind(
            header,
            ParameterKind::String {
                value: default_value.clone(),
                default_value,
            },
        )
    }

    pub fn selectable(
        header: impl Into<String>,
        default_value: impl Into<String>,
        options: Vec<SelectableOption>,
    ) -> Self {
        let default_value = default_value.into();
        Self::with_kind(
            header,
            ParameterKind::Selectable {
                value: default_value.clone(),
                default_value,
                options,
            },
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn affecting(mut self, lifecycle: ModelLifecycle) -> Self {
        self.affects_outcome_of = lifecycle;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible_in_ui = false;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn with_ui_rules(mut self, ui_rules: Value) -> Self {
        self.ui_rules = Some(ui_rules);
        self
    }

    /// Coerce `raw` to this parameter's type, check it against the bounds
    /// or options, and assign it. On error the current value is untouched.
    ///
    /// `name` is only used to build the error message.
    pub fn set_value(&mut self, name: &str, raw: &Value) -> Result<(), String> {
        match &mut self.kind {
            ParameterKind::Integer {
                value,
                min_value,
                max_value,
                ..
            } => {
                // `as_i64` is `None` for booleans and for any float literal.
                let candidate = raw
                    .as_i64()
                    .ok_or_else(|| format!("{name}: expected an integer value, got {raw}"))?;
                check_range(name, candidate, *min_value, *max_value)?;
                *value = candidate;
            }
            ParameterKind::Float {
                value,
                min_value,
                max_value,
                ..
            } => {
                let candidate = raw
                    .as_f64()
                    .ok_or_else(|| format!("{name}: expected a float value, got {raw}"))?;
                check_float_range(name, candidate, *min_value, *max_value)?;
                *value = candidate;
            }
            ParameterKind::Boolean { value, .. } => {
                *value = raw
                    .as_bool()
                    .ok_or_else(|| format!("{name}: expected a boolean value, got {raw}"))?;
            }
            ParameterKind::String { value, .. } => {
                *value = raw
                    .as_str()
                    .ok_or_else(|| format!("{name}: expected a string value, got {raw}"))?
                    .to_string();
            }
            ParameterKind::Selectable { value, options, .. } => {
                *value = match_option(name, raw, options)?;
            }
        }
        Ok(())
    }

    /// Check that the current value satisfies the declared constraints.
    pub fn validate(&self, name: &str) -> Result<(), String> {
        match &self.kind {
            ParameterKind::Integer {
                value,
                min_value,
                max_value,
                ..
            } => check_range(name, *value, *min_value, *max_value),
            ParameterKind::Float {
                value,
                min_value,
                max_value,
                ..
            } => check_float_range(name, *value, *min_value, *max_value),
            ParameterKind::Boolean { .. } | ParameterKind::String { .. } => Ok(()),
            ParameterKind::Selectable { value, options, .. } => {
                if options.iter().any(|o| &o.value == value) {
                    Ok(())
                } else {
                    Err(invalid_option(name, value, options))
                }
            }
        }
    }
}

fn check_range(name: &str, value: i64, min: i64, max: i64) -> Result<(), String> {
    if !(min..=max).contains(&value) {
        return Err(format!("{name}: value {value} out of range [{min}, {max}]"));
    }
    Ok(())
}

fn check_float_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), String> {
    if !(min..=max).contains(&value) {
        return Err(format!("{name}: value {value} out of range [{min}, {max}]"));
    }
    Ok(())
}

fn invalid_option(name: &str, candidate: &str, options: &[SelectableOption]) -> String {
    let valid: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
    format!(
        "{name}: '{candidate}' is not a valid option. Must be one of: {}",
        valid.join(", ")
    )
}

/// Resolve a selectable input to the canonical option value.
///
/// Accepts an option name or value as a string, or an option object
/// (`{"name": .., "value": ..}`) as produced when serializing an option.
fn match_option(name: &str, raw: &Value, options: &[SelectableOption]) -> Result<String, String> {
    let candidate = match raw {
        Value::String(s) => s.as_str(),
        Value::Object(obj) => obj
            .get("value")
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| format!("{name}: option object must carry a string 'value'"))?,
        other => return Err(format!("{name}: expected an option name or value, got {other}")),
    };

    options
        .iter()
        .find(|o| o.value == candidate || o.name == candidate)
        .map(|o| o.value.clone())
        .ok_or_else(|| invalid_option(name, candidate, options))
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A node of the parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterNode {
    Group(ParameterGroup),
    Parameter(Parameter),
}

/// Ordered collection of named child nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterGroup {
    pub header: String,
    pub description: String,
    pub children: IndexMap<String, ParameterNode>,
}

impl ParameterGroup {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            description: String::new(),
            children: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, parameter: Parameter) -> Self {
        self.children
            .insert(name.into(), ParameterNode::Parameter(parameter));
        self
    }

    pub fn with_group(mut self, name: impl Into<String>, group: ParameterGroup) -> Self {
        self.children.insert(name.into(), ParameterNode::Group(group));
        self
    }

    /// Look up a node by its path of child names.
    pub fn get(&self, path: &[&str]) -> Option<&ParameterNode> {
        let (last, parents) = path.split_last()?;
        let mut group = self;
        for segment in parents {
            match group.children.get(*segment)? {
                ParameterNode::Group(g) => group = g,
                ParameterNode::Parameter(_) => return None,
            }
        }
        group.children.get(*last)
    }

    pub fn parameter(&self, path: &[&str]) -> Option<&Parameter> {
        match self.get(path)? {
            ParameterNode::Parameter(p) => Some(p),
            ParameterNode::Group(_) => None,
        }
    }

    pub fn parameter_mut(&mut self, path: &[&str]) -> Option<&mut Parameter> {
        let (last, parents) = path.split_last()?;
        let mut group = self;
        for segment in parents {
            match group.children.get_mut(*segment)? {
                ParameterNode::Group(g) => group = g,
                ParameterNode::Parameter(_) => return None,
            }
        }
        match group.children.get_mut(*last)? {
            ParameterNode::Parameter(p) => Some(p),
            ParameterNode::Group(_) => None,
        }
    }

    /// All leaves with their dot-separated paths, in declaration order.
    pub fn leaves(&self) -> Vec<(String, &Parameter)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Parameter)>) {
        for (name, node) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match node {
                ParameterNode::Group(g) => g.collect_leaves(&path, out),
                ParameterNode::Parameter(p) => out.push((path, p)),
            }
        }
    }

    /// Validate every leaf, aggregating all violations into one error.
    pub fn validate(&self) -> Result<(), CoreError> {
        let errors: Vec<String> = self
            .leaves()
            .into_iter()
            .filter_map(|(path, p)| p.validate(&path).err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(errors.join("; ")))
        }
    }

    // -- Typed getters -------------------------------------------------------

    /// Current value of the leaf at `path` in its JSON form.
    pub fn get_value(&self, path: &[&str]) -> Option<Value> {
        self.parameter(path).map(|p| p.kind.value_json())
    }

    fn required(&self, path: &[&str]) -> Result<&Parameter, CoreError> {
        self.parameter(path).ok_or_else(|| CoreError::StructureMismatch {
            path: path.join("."),
            segment: path.last().copied().unwrap_or_default().to_string(),
        })
    }

    fn type_error(path: &[&str], expected: &str, found: &ParameterKind) -> CoreError {
        CoreError::Validation(format!(
            "{}: expected {expected} parameter, found {}",
            path.join("."),
            found.type_name()
        ))
    }

    pub fn integer_value(&self, path: &[&str]) -> Result<i64, CoreError> {
        match &self.required(path)?.kind {
            ParameterKind::Integer { value, .. } => Ok(*value),
            other => Err(Self::type_error(path, TYPE_INTEGER, other)),
        }
    }

    pub fn float_value(&self, path: &[&str]) -> Result<f64, CoreError> {
        match &self.required(path)?.kind {
            ParameterKind::Float { value, .. } => Ok(*value),
            other => Err(Self::type_error(path, TYPE_FLOAT, other)),
        }
    }

    pub fn bool_value(&self, path: &[&str]) -> Result<bool, CoreError> {
        match &self.required(path)?.kind {
            ParameterKind::Boolean { value, .. } => Ok(*value),
            other => Err(Self::type_error(path, TYPE_BOOLEAN, other)),
        }
    }

    pub fn text_value(&self, path: &[&str]) -> Result<&str, CoreError> {
        match &self.required(path)?.kind {
            ParameterKind::String { value, .. } | ParameterKind::Selectable { value, .. } => {
                Ok(value.as_str())
            }
            other => Err(Self::type_error(path, TYPE_STRING, other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
