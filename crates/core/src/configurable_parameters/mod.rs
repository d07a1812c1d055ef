//! Configurable parameters: typed trees, dict conversion, substitution and
//! resolution of stored values against evolving defaults.

pub mod dict;
pub mod parameter;
pub mod resolution;
pub mod schema;
pub mod substitution;

pub use parameter::{
    ModelLifecycle, Parameter, ParameterGroup, ParameterKind, ParameterNode, SelectableOption,
};
pub use resolution::{resolve_stored_parameters, select_parameters, ResolvedParameters};
pub use schema::ParameterSchema;
pub use substitution::{substitute_from_tree, substitute_values, SubstitutionOptions};
