//! Module: relation
//! Responsibility: target resolution, related-name construction, reverse
//! accessors, and delete cascades.
//! Does not own: the registries (see `registry`) or storage primitives.
//!
//! Invariants:
//! - A field's resolved target never changes once computed.
//! - Related names are validated identifiers before anything is registered.
//! - Cascades only mutate fields that still reference the deleted pk.

mod accessor;
mod cascade;
mod name;
mod target;

pub use accessor::ReverseAccessor;
pub use cascade::CascadeReport;
pub use name::{
    MODEL_PLACEHOLDER, NAMESPACE_PLACEHOLDER, NameError, build_related_name, validate_identifier,
};
pub use target::TargetSpec;

pub(crate) use cascade::on_delete;

use crate::{
    ErrorClass, ErrorOrigin,
    model::{IdentityError, ModelKey, RelationField},
    obs::sink::{MetricsEvent, record},
    registry::ModelTable,
    store::Pk,
};
use thiserror::Error as ThisError;

///
/// RelationError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum RelationError {
    #[error("relation {model}.{field} targets abstract model '{target}'")]
    AbstractTarget {
        model: ModelKey,
        field: String,
        target: ModelKey,
    },

    #[error(
        "cannot delete {target}:{pk}: referenced by {source_model}.{field} on record '{referencing}'"
    )]
    DeleteBlocked {
        target: ModelKey,
        pk: Pk,
        source_model: ModelKey,
        field: String,
        referencing: Pk,
    },

    #[error("model '{model}' declares relation field '{field}' twice")]
    DuplicateField { model: ModelKey, field: String },

    #[error(
        "related name '{name}' on '{target}' is already used by {existing}; rejected for {incoming}"
    )]
    DuplicateRelatedName {
        target: ModelKey,
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("relation field name '{field}' on '{model}' is invalid: {err}")]
    InvalidFieldName {
        model: ModelKey,
        field: String,
        #[source]
        err: NameError,
    },

    #[error("related name of {model}.{field} is invalid: {err}")]
    InvalidRelatedName {
        model: ModelKey,
        field: String,
        #[source]
        err: NameError,
    },

    #[error("target of {model}.{field} is not a valid model name: {err}")]
    InvalidTarget {
        model: ModelKey,
        field: String,
        #[source]
        err: IdentityError,
    },

    #[error("relation {model}.{field} targets unknown model '{target}'")]
    ModelNotFound {
        model: ModelKey,
        field: String,
        target: ModelKey,
    },

    #[error("model '{model}' has no reverse accessor '{name}'")]
    UnknownAccessor { model: ModelKey, name: String },

    #[error("model '{model}' has no relation field '{field}'")]
    UnknownField { model: ModelKey, field: String },
}

impl RelationError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::AbstractTarget { .. }
            | Self::InvalidFieldName { .. }
            | Self::InvalidRelatedName { .. }
            | Self::InvalidTarget { .. } => ErrorClass::Unsupported,
            Self::DeleteBlocked { .. }
            | Self::DuplicateField { .. }
            | Self::DuplicateRelatedName { .. } => ErrorClass::Conflict,
            Self::ModelNotFound { .. }
            | Self::UnknownAccessor { .. }
            | Self::UnknownField { .. } => ErrorClass::NotFound,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::DeleteBlocked { .. } => ErrorOrigin::Cascade,
            _ => ErrorOrigin::Relation,
        }
    }
}

/// Look up a field's canonical target in the model table.
pub(crate) fn resolve_target(
    field: &RelationField,
    models: &ModelTable,
) -> Result<ModelKey, RelationError> {
    let target = field.target_key();

    match models.get(target) {
        None => Err(RelationError::ModelNotFound {
            model: field.source().clone(),
            field: field.name().to_string(),
            target: target.clone(),
        }),
        Some(model) if model.is_abstract() => Err(RelationError::AbstractTarget {
            model: field.source().clone(),
            field: field.name().to_string(),
            target: target.clone(),
        }),
        Some(_) => {
            log::debug!(
                "resolved {}.{} ({}) -> {target}",
                field.source(),
                field.name(),
                field.target_spec()
            );
            record(MetricsEvent::TargetResolved {
                model: field.source().as_str(),
            });

            Ok(target.clone())
        }
    }
}
