use crate::{config::RelationConfig, model::ModelIdentity};
use thiserror::Error as ThisError;

/// Placeholder replaced by the source model namespace.
pub const NAMESPACE_PLACEHOLDER: &str = "%(namespace)s";

/// Placeholder replaced by the lower-cased source model name.
pub const MODEL_PLACEHOLDER: &str = "%(model)s";

///
/// NameError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum NameError {
    #[error("name is empty")]
    Empty,

    #[error("name '{name}' contains invalid character '{ch}'")]
    InvalidChar { name: String, ch: char },

    #[error("name '{0}' must not start with a digit")]
    LeadingDigit(String),

    #[error("name '{name}' length {len} exceeds max {max}")]
    TooLong { name: String, len: usize, max: usize },
}

/// Compute the reverse-accessor name of a relation declared on `source`.
///
/// With a pattern, `%(namespace)s` becomes the source namespace (characters
/// illegal in identifiers mapped to `_`) and `%(model)s` the lower-cased
/// source model name. Without one the name is `<model><suffix>`.
pub fn build_related_name(
    pattern: Option<&str>,
    source: &ModelIdentity,
    config: &RelationConfig,
) -> Result<String, NameError> {
    let model = source.name().to_ascii_lowercase();

    let name = match pattern {
        Some(pattern) => pattern
            .replace(NAMESPACE_PLACEHOLDER, &identifier_safe(source.namespace()))
            .replace(MODEL_PLACEHOLDER, &model),
        None => format!("{model}{}", config.default_related_suffix),
    };
    validate_identifier(&name, config.max_name_len)?;

    Ok(name)
}

/// Check that `name` is usable as an accessor or field identifier.
pub fn validate_identifier(name: &str, max_len: usize) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(NameError::InvalidChar {
            name: name.to_string(),
            ch,
        });
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(NameError::LeadingDigit(name.to_string()));
    }
    if name.len() > max_len {
        return Err(NameError::TooLong {
            name: name.to_string(),
            len: name.len(),
            max: max_len,
        });
    }

    Ok(())
}

fn identifier_safe(namespace: &str) -> String {
    namespace
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn identity(namespace: &str, name: &str) -> ModelIdentity {
        ModelIdentity::new(namespace, name).expect("identity should be valid")
    }

    #[test]
    fn default_name_is_lowercased_model_with_suffix() {
        let name = build_related_name(
            None,
            &identity("tests", "Person"),
            &RelationConfig::default(),
        )
        .expect("default name should build");

        assert_eq!(name, "person_set");
    }

    #[test]
    fn default_suffix_follows_config() {
        let config = RelationConfig {
            default_related_suffix: "_refs".to_string(),
            ..RelationConfig::default()
        };
        let name = build_related_name(None, &identity("tests", "Person"), &config)
            .expect("default name should build");

        assert_eq!(name, "person_refs");
    }

    #[test]
    fn placeholders_use_source_namespace_and_model() {
        let name = build_related_name(
            Some("%(namespace)s_%(model)s_set"),
            &identity("related-name", "PersonTest"),
            &RelationConfig::default(),
        )
        .expect("pattern should build");

        assert_eq!(name, "related_name_persontest_set");

        let plain = build_related_name(
            Some("%(namespace)s_%(model)s_set"),
            &identity("ns", "Bar"),
            &RelationConfig::default(),
        )
        .expect("pattern should build");
        assert_eq!(plain, "ns_bar_set");
    }

    #[test]
    fn hyphenated_name_is_rejected() {
        let err = build_related_name(
            Some("list-of-persons"),
            &identity("tests", "PersonTest"),
            &RelationConfig::default(),
        )
        .expect_err("hyphenated name should be rejected");

        assert_eq!(
            err,
            NameError::InvalidChar {
                name: "list-of-persons".to_string(),
                ch: '-',
            }
        );
    }

    #[test]
    fn identifier_rules() {
        assert_eq!(validate_identifier("", 64), Err(NameError::Empty));
        assert!(matches!(
            validate_identifier("9lives", 64),
            Err(NameError::LeadingDigit(_))
        ));
        assert!(matches!(
            validate_identifier("a/b", 64),
            Err(NameError::InvalidChar { ch: '/', .. })
        ));
        assert!(matches!(
            validate_identifier("abcdef", 5),
            Err(NameError::TooLong { len: 6, max: 5, .. })
        ));
        assert_eq!(validate_identifier("_owned_groups2", 64), Ok(()));
    }

    proptest! {
        #[test]
        fn templated_names_are_always_identifiers(
            namespace in "[a-z][a-z0-9_.-]{0,20}",
            model in "[A-Za-z_][A-Za-z0-9_]{0,20}",
        ) {
            let name = build_related_name(
                Some("%(namespace)s_%(model)s_set"),
                &identity(&namespace, &model),
                &RelationConfig::default(),
            );

            prop_assert!(name.is_ok());
        }

        #[test]
        fn default_names_never_depend_on_namespace(
            a in "[a-z][a-z0-9-]{0,10}",
            b in "[a-z][a-z0-9-]{0,10}",
            model in "[A-Za-z_][A-Za-z0-9_]{0,20}",
        ) {
            let config = RelationConfig::default();
            let left = build_related_name(None, &identity(&a, &model), &config);
            let right = build_related_name(None, &identity(&b, &model), &config);

            prop_assert_eq!(left, right);
        }
    }
}
