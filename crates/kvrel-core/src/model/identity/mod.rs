//! Module: identity
//! Responsibility: validated namespace/model naming and the canonical model key.
//! Does not own: relation policy, registry membership, or storage layout.
//! Boundary: every model identity used as a registry or store key is built here.
//!
//! Invariants:
//! - Identities are ASCII, non-empty, and bounded by `MAX_NAME_LEN`.
//! - Model names are identifiers (so `<name>_set` is a legal accessor).
//! - The canonical key is `namespace:name`, lower-cased; display keeps case.


use crate::{MAX_NAME_LEN, NAMESPACE_SEPARATOR};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// IdentityPart
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdentityPart {
    Namespace,
    Model,
}

impl fmt::Display for IdentityPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Namespace => "namespace",
            Self::Model => "model name",
        };
        write!(f, "{label}")
    }
}

///
/// IdentityError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum IdentityError {
    #[error("{part} is empty")]
    Empty { part: IdentityPart },

    #[error("{part} '{value}' contains invalid character '{ch}'")]
    InvalidChar {
        part: IdentityPart,
        value: String,
        ch: char,
    },

    #[error("{part} '{value}' must not start with a digit")]
    LeadingDigit { part: IdentityPart, value: String },

    #[error("model key '{0}' must have the form 'namespace:name'")]
    MissingSeparator(String),

    #[error("{part} must be ASCII")]
    NonAscii { part: IdentityPart },

    #[error("{part} length {len} exceeds max {max}")]
    TooLong {
        part: IdentityPart,
        len: usize,
        max: usize,
    },
}

///
/// ModelKey
///
/// Canonical, case-normalized `namespace:name` identity of a model.
///

#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ModelKey(String);

impl ModelKey {
    /// Validate both parts and build the canonical key.
    pub fn new(namespace: &str, name: &str) -> Result<Self, IdentityError> {
        validate_namespace(namespace)?;
        validate_model_name(name)?;

        Ok(Self(format!(
            "{}{NAMESPACE_SEPARATOR}{}",
            namespace.to_ascii_lowercase(),
            name.to_ascii_lowercase()
        )))
    }

    /// Parse a fully qualified `namespace:name` string.
    pub fn parse(qualified: &str) -> Result<Self, IdentityError> {
        let Some((namespace, name)) = qualified.split_once(NAMESPACE_SEPARATOR) else {
            return Err(IdentityError::MissingSeparator(qualified.to_string()));
        };

        Self::new(namespace, name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    /// Borrow the lower-cased namespace part.
    pub fn namespace(&self) -> &str {
        self.split().0
    }

    #[must_use]
    /// Borrow the lower-cased model-name part.
    pub fn name(&self) -> &str {
        self.split().1
    }

    // Invariant: construction always inserts exactly one separator and
    // neither part may contain it.
    fn split(&self) -> (&str, &str) {
        self.0
            .split_once(NAMESPACE_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }
}

impl AsRef<str> for ModelKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for ModelKey {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModelKey> for String {
    fn from(key: ModelKey) -> Self {
        key.0
    }
}

///
/// ModelIdentity
///
/// Case-preserving identity of one model plus its canonical key.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelIdentity {
    namespace: String,
    name: String,
    key: ModelKey,
}

impl ModelIdentity {
    pub fn new(namespace: &str, name: &str) -> Result<Self, IdentityError> {
        let key = ModelKey::new(namespace, name)?;

        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key,
        })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn key(&self) -> &ModelKey {
        &self.key
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{NAMESPACE_SEPARATOR}{}", self.namespace, self.name)
    }
}

// Validate shared bounds: non-empty, ASCII, length-limited.
fn validate_bounds(part: IdentityPart, value: &str) -> Result<(), IdentityError> {
    if value.is_empty() {
        return Err(IdentityError::Empty { part });
    }
    if !value.is_ascii() {
        return Err(IdentityError::NonAscii { part });
    }
    if value.len() > MAX_NAME_LEN {
        return Err(IdentityError::TooLong {
            part,
            len: value.len(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

fn validate_namespace(namespace: &str) -> Result<(), IdentityError> {
    let part = IdentityPart::Namespace;
    validate_bounds(part, namespace)?;

    if let Some(ch) = namespace
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(IdentityError::InvalidChar {
            part,
            value: namespace.to_string(),
            ch,
        });
    }

    Ok(())
}

fn validate_model_name(name: &str) -> Result<(), IdentityError> {
    let part = IdentityPart::Model;
    validate_bounds(part, name)?;

    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(IdentityError::InvalidChar {
            part,
            value: name.to_string(),
            ch,
        });
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(IdentityError::LeadingDigit {
            part,
            value: name.to_string(),
        });
    }

    Ok(())
}
