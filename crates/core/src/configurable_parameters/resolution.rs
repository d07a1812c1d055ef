//! Resolution of persisted parameter values against current defaults.
//!
//! Stored records may predate the current schema: new leaves are missing,
//! removed leaves linger, bounds may have tightened. Resolution starts from
//! a fresh copy of the defaults and substitutes stored values leniently.

use serde_json::Value;

use super::parameter::ParameterGroup;
use super::substitution::{substitute_values, SubstitutionOptions};
use crate::error::CoreError;

/// Outcome of [`select_parameters`].
#[derive(Debug)]
pub enum ResolvedParameters {
    /// Stored values applied on top of the defaults.
    Stored(ParameterGroup),
    /// Defaults only; `rejected` holds the reason stored values were dropped.
    Defaults {
        parameters: ParameterGroup,
        rejected: Option<CoreError>,
    },
}

impl ResolvedParameters {
    pub fn into_parameters(self) -> ParameterGroup {
        match self {
            Self::Stored(p) => p,
            Self::Defaults { parameters, .. } => parameters,
        }
    }

    pub fn used_stored_values(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// Apply `stored` values to a copy of `defaults`, skipping paths the current
/// schema no longer has.
pub fn resolve_stored_parameters(
    defaults: &ParameterGroup,
    stored: &Value,
) -> Result<ParameterGroup, CoreError> {
    let mut tree = defaults.clone();
    substitute_values(&mut tree, stored, &SubstitutionOptions::allow_missing())?;
    Ok(tree)
}

/// Pick the effective tree: stored values when they still validate against
/// `defaults`, the untouched defaults otherwise.
pub fn select_parameters(defaults: &ParameterGroup, stored: Option<&Value>) -> ResolvedParameters {
    let Some(stored) = stored else {
        return ResolvedParameters::Defaults {
            parameters: defaults.clone(),
            rejected: None,
        };
    };
    match resolve_stored_parameters(defaults, stored) {
        Ok(tree) => ResolvedParameters::Stored(tree),
        Err(e) => ResolvedParameters::Defaults {
            parameters: defaults.clone(),
            rejected: Some(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurable_parameters::parameter::Parameter;
    use serde_json::json;

    fn defaults() -> ParameterGroup {
        ParameterGroup::new("Dataset")
            .with_parameter("required", Parameter::integer("Required", 12, 3, 100))
            .with_parameter("dynamic", Parameter::boolean("Dynamic", true))
    }

    #[test]
    fn no_stored_record_yields_defaults() {
        let resolved = select_parameters(&defaults(), None);
        assert!(!resolved.used_stored_values());
        assert_eq!(resolved.into_parameters(), defaults());
    }

    #[test]
    fn stored_values_override_defaults() {
        let stored = json!({"required": {"value": 40}});
        let resolved = select_parameters(&defaults(), Some(&stored));
        assert!(resolved.used_stored_values());
        let tree = resolved.into_parameters();
        assert_eq!(tree.integer_value(&["required"]).unwrap(), 40);
        assert!(tree.bool_value(&["dynamic"]).unwrap());
    }

    #[test]
    fn removed_leaves_in_stored_data_are_ignored() {
        let stored = json!({"required": {"value": 20}, "legacy_flag": {"value": true}});
        let tree = resolve_stored_parameters(&defaults(), &stored).unwrap();
        assert_eq!(tree.integer_value(&["required"]).unwrap(), 20);
    }

    #[test]
    fn invalid_stored_value_falls_back_to_defaults() {
        let stored = json!({"required": {"value": 1}, "dynamic": {"value": false}});
        let resolved = select_parameters(&defaults(), Some(&stored));
        match resolved {
            ResolvedParameters::Defaults { parameters, rejected } => {
                assert_eq!(parameters, defaults());
                assert!(rejected.is_some());
            }
            ResolvedParameters::Stored(_) => panic!("expected fallback to defaults"),
        }
    }
}
