//! Data model for HTTP request collections.
//!
//! This crate provides the pieces a request collection is built from:
//!
//! - **property**: [`PropertyList`], an ordered, keyed container of entities
//!   such as headers or variables
//! - **variables**: typed [`Variable`]s, [`VariableList`] with `{{name}}`
//!   substitution, and layered [`VariableScope`]s
//! - **mutations**: a replayable, compactable log of variable changes
//! - **config**: settings shared by the modules above
//! - **error**: the crate's error type
//!
//! # Example
//!
//! ```
//! use rest_collection::{TrackingOptions, VariableList, VariableScope};
//! use rest_collection::variables::shared;
//!
//! let globals = shared(VariableList::from_variables(vec![("host", "api.example.com")]));
//! let mut environment = VariableScope::new().with_layer(globals);
//!
//! environment.enable_tracking(TrackingOptions::default());
//! environment.set("version", "v2", None);
//!
//! assert_eq!(
//!     environment.replace("https://{{host}}/{{version}}/users"),
//!     "https://api.example.com/v2/users"
//! );
//! assert_eq!(environment.mutations().map(|log| log.len()), Some(1));
//! ```

pub mod config;
pub mod error;
pub mod mutations;
pub mod property;
pub mod variables;

pub use config::{CoreConfig, TrackingOptions};
pub use error::{CollectionError, Result};
pub use mutations::{Mutation, MutationTarget, MutationTracker};
pub use property::{Header, Property, PropertyList};
pub use variables::{Variable, VariableList, VariableScope, VariableType};
