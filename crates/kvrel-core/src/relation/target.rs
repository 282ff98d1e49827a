use crate::{
    NAMESPACE_SEPARATOR, SELF_MARKER,
    model::{IdentityError, Model, ModelKey},
};
use std::{fmt, sync::Arc};

///
/// TargetSpec
///
/// Raw target of a relation as declared. Resolution against the model
/// registry happens later; only the canonical key is derived eagerly.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TargetSpec {
    /// Direct reference to an already-defined model.
    Model(ModelKey),
    /// The source model itself.
    SelfRef,
    /// Model name inside the source model namespace.
    Name(String),
    /// Fully qualified `namespace:name`.
    Qualified(String),
}

impl TargetSpec {
    /// Canonical key this spec designates when declared on `source`.
    ///
    /// Purely syntactic: the target does not have to exist yet.
    pub fn canonical_key(&self, source: &ModelKey) -> Result<ModelKey, IdentityError> {
        match self {
            Self::Model(key) => Ok(key.clone()),
            Self::SelfRef => Ok(source.clone()),
            Self::Name(name) => ModelKey::new(source.namespace(), name),
            Self::Qualified(qualified) => ModelKey::parse(qualified),
        }
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(key) => write!(f, "{key}"),
            Self::SelfRef => f.write_str(SELF_MARKER),
            Self::Name(name) | Self::Qualified(name) => f.write_str(name),
        }
    }
}

impl From<&str> for TargetSpec {
    fn from(value: &str) -> Self {
        if value == SELF_MARKER {
            Self::SelfRef
        } else if value.contains(NAMESPACE_SEPARATOR) {
            Self::Qualified(value.to_string())
        } else {
            Self::Name(value.to_string())
        }
    }
}

impl From<String> for TargetSpec {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ModelKey> for TargetSpec {
    fn from(key: ModelKey) -> Self {
        Self::Model(key)
    }
}

impl From<&ModelKey> for TargetSpec {
    fn from(key: &ModelKey) -> Self {
        Self::Model(key.clone())
    }
}

impl From<&Model> for TargetSpec {
    fn from(model: &Model) -> Self {
        Self::Model(model.key().clone())
    }
}

impl From<&Arc<Model>> for TargetSpec {
    fn from(model: &Arc<Model>) -> Self {
        Self::Model(model.key().clone())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ModelKey {
        ModelKey::parse("related-to:Bar").expect("key should parse")
    }

    #[test]
    fn string_forms_are_classified() {
        assert_eq!(TargetSpec::from("self"), TargetSpec::SelfRef);
        assert_eq!(
            TargetSpec::from("Foo"),
            TargetSpec::Name("Foo".to_string())
        );
        assert_eq!(
            TargetSpec::from("other:Foo"),
            TargetSpec::Qualified("other:Foo".to_string())
        );
    }

    #[test]
    fn every_form_yields_the_same_canonical_key() {
        let expected = ModelKey::parse("related-to:foo").expect("key should parse");
        let specs = [
            TargetSpec::from(&expected),
            TargetSpec::from("Foo"),
            TargetSpec::from("related-to:Foo"),
            TargetSpec::from("RELATED-TO:foo"),
        ];

        for spec in specs {
            assert_eq!(
                spec.canonical_key(&source())
                    .expect("canonical key should build"),
                expected,
                "spec {spec} should designate {expected}"
            );
        }
    }

    #[test]
    fn self_designates_the_source() {
        let key = TargetSpec::SelfRef
            .canonical_key(&source())
            .expect("self should resolve syntactically");

        assert_eq!(key, source());
    }

    #[test]
    fn malformed_names_fail_syntactically() {
        assert!(TargetSpec::from("bad-name").canonical_key(&source()).is_err());
        assert!(TargetSpec::from(":Foo").canonical_key(&source()).is_err());
    }
}
