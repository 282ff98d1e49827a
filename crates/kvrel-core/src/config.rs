//! Module: config
//! Responsibility: engine-level settings for related-name construction.
//! Does not own: store connection settings (those belong to the store client).
//!
//! Invariants:
//! - A validated config always produces identifier-safe default related names.

use crate::MAX_NAME_LEN;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Default suffix appended to the lower-cased source model name.
pub const DEFAULT_RELATED_SUFFIX: &str = "_set";

/// Hard upper bound accepted for `max_name_len`.
pub const MAX_NAME_LEN_LIMIT: usize = 255;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("related-name suffix '{0}' must be non-empty ASCII alphanumerics or '_'")]
    InvalidSuffix(String),

    #[error("max_name_len {len} must be between 1 and {max}")]
    InvalidMaxNameLen { len: usize, max: usize },

    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

///
/// RelationConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationConfig {
    /// Suffix for related names built without an explicit pattern.
    pub default_related_suffix: String,

    /// Maximum accepted length of a computed related name.
    pub max_name_len: usize,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            default_related_suffix: DEFAULT_RELATED_SUFFIX.to_string(),
            max_name_len: MAX_NAME_LEN,
        }
    }
}

impl RelationConfig {
    /// Parse and validate a config from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let suffix = &self.default_related_suffix;
        if suffix.is_empty()
            || !suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidSuffix(suffix.clone()));
        }

        if self.max_name_len == 0 || self.max_name_len > MAX_NAME_LEN_LIMIT {
            return Err(ConfigError::InvalidMaxNameLen {
                len: self.max_name_len,
                max: MAX_NAME_LEN_LIMIT,
            });
        }

        Ok(())
    }
}
