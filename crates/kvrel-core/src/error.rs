use crate::{
    config::ConfigError, db::InstanceError, registry::RegistryError, relation::RelationError,
    store::StoreError, store::middleware::MiddlewareError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Public error surface for every kvrel operation.
/// Each variant wraps the error type owned by the module that raised it;
/// `class()` and `origin()` give a stable classification on top.
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Relation(#[from] RelationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) | Self::Middleware(_) => ErrorClass::Unsupported,
            Self::Instance(err) => err.class(),
            Self::Registry(err) => err.class(),
            Self::Relation(err) => err.class(),
            Self::Store(err) => err.class(),
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Config(_) => ErrorOrigin::Config,
            Self::Instance(_) => ErrorOrigin::Instance,
            Self::Middleware(_) => ErrorOrigin::Middleware,
            Self::Registry(_) => ErrorOrigin::Registry,
            Self::Relation(err) => err.origin(),
            Self::Store(_) => ErrorOrigin::Store,
        }
    }

    /// Return true when a relation target could not be found at first use.
    #[must_use]
    pub const fn is_model_not_found(&self) -> bool {
        matches!(self, Self::Relation(RelationError::ModelNotFound { .. }))
    }

    /// Return true when a related name failed identifier validation.
    #[must_use]
    pub const fn is_invalid_related_name(&self) -> bool {
        matches!(self, Self::Relation(RelationError::InvalidRelatedName { .. }))
    }

    /// Return true when a related name collided on its target model.
    #[must_use]
    pub const fn is_duplicate_related_name(&self) -> bool {
        matches!(
            self,
            Self::Relation(RelationError::DuplicateRelatedName { .. })
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {self}", self.origin(), self.class())
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Conflict,
    Corruption,
    Internal,
    NotFound,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conflict => "conflict",
            Self::Corruption => "corruption",
            Self::Internal => "internal",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Cascade,
    Config,
    Instance,
    Middleware,
    Registry,
    Relation,
    Store,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Cascade => "cascade",
            Self::Config => "config",
            Self::Instance => "instance",
            Self::Middleware => "middleware",
            Self::Registry => "registry",
            Self::Relation => "relation",
            Self::Store => "store",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKey;

    #[test]
    fn relation_errors_keep_their_classification() {
        let key = ModelKey::parse("tests:group").expect("key should parse");
        let err: Error = RelationError::ModelNotFound {
            model: key.clone(),
            field: "owner".to_string(),
            target: ModelKey::parse("tests:person").expect("key should parse"),
        }
        .into();

        assert!(err.is_model_not_found());
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(err.origin(), ErrorOrigin::Relation);
        assert!(
            err.display_with_class()
                .starts_with("relation:not_found: "),
            "classified display should lead with origin and class"
        );
    }

    #[test]
    fn store_errors_are_store_origin() {
        let err: Error = StoreError::Backend("connection reset".to_string()).into();

        assert_eq!(err.origin(), ErrorOrigin::Store);
        assert_eq!(err.class(), ErrorClass::Internal);
        assert!(!err.is_duplicate_related_name());
    }
}
