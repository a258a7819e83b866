//! Configuration loading for the collection core.
//!
//! Settings are read from a JSON object under the `"collection"` key, merged
//! with defaults and validated.

pub mod schema;

pub use schema::{CoreConfig, TrackingOptions, DEFAULT_MAX_SUBSTITUTION_DEPTH};

use crate::error::{CollectionError, Result};
use serde_json::Value;

/// Settings key the core reads its section from.
pub const SETTINGS_KEY: &str = "collection";

/// Loads configuration from an optional settings object.
///
/// A section that fails to deserialize is ignored with a warning and the
/// defaults are used instead. A section that deserializes but fails
/// validation is an error.
///
/// # Example
///
/// ```
/// use rest_collection::config::load_config;
/// use serde_json::json;
///
/// let settings = json!({ "collection": { "maxSubstitutionDepth": 5 } });
/// let config = load_config(Some(settings)).unwrap();
/// assert_eq!(config.max_substitution_depth, 5);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<CoreConfig> {
    let mut config = CoreConfig::default();

    if let Some(section) = settings_json.as_ref().and_then(|s| s.get(SETTINGS_KEY)) {
        match serde_json::from_value::<CoreConfig>(section.clone()) {
            Ok(user_config) => config = config.merge(&user_config),
            Err(e) => {
                log::warn!(
                    "Failed to parse {} settings: {}. Using defaults.",
                    SETTINGS_KEY,
                    e
                );
            }
        }
    }

    config.validate().map_err(CollectionError::InvalidConfig)?;

    Ok(config)
}
