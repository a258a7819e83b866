//! Error types for the collection core.
//!
//! Most list and scope operations never fail: malformed members are skipped and
//! missing keys are no-ops. Errors are reserved for parsing serialized input and
//! for invalid configuration.

use thiserror::Error;

/// Errors surfaced by parsing and configuration entry points.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Input was not valid JSON or did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A mutation log record could not be decoded.
    #[error("Invalid mutation record: {0}")]
    InvalidMutation(String),

    /// A list or scope definition was neither an array nor an object.
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CollectionError>;
