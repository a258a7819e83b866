//! Variables module
//!
//! Typed variables, ordered variable lists with `{{name}}` substitution, and
//! layered scopes that can record their own mutations.

pub mod list;
pub mod scope;
pub mod substitution;
pub mod variable;

pub use list::{SyncReport, VariableList};
pub use scope::{shared, SharedVariableList, VariableScope};
pub use substitution::{Resolver, Substitutor};
pub use variable::{primitive_text, Variable, VariableDefinition, VariableType};
