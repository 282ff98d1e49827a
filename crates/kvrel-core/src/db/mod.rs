//! Module: db
//! Responsibility: model framework glue. Defines models, hands out
//! instance handles, and runs cascades from the delete lifecycle.
//! Does not own: relation rules (see `relation`) or persistence (see `store`).
//!
//! Invariants:
//! - Every instance handle refers to a concrete model.
//! - `Instance::delete` cascades before the record itself is removed.

mod instance;


pub use instance::{Instance, RelationValue};

use crate::{
    Error, ErrorClass,
    config::RelationConfig,
    model::{Model, ModelDef, ModelKey, RelationField, RelationKind},
    registry::Registry,
    relation::{CascadeReport, RelationError, ReverseAccessor, on_delete},
    store::{Pk, Store},
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// InstanceError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum InstanceError {
    #[error("model '{0}' is abstract and cannot own records")]
    AbstractModel(ModelKey),

    #[error("record '{model}:{pk}' already exists")]
    AlreadyExists { model: ModelKey, pk: Pk },

    #[error("record '{model}:{pk}' not found")]
    NotFound { model: ModelKey, pk: Pk },

    #[error("{model}.{field} expects a '{expected}' instance, got '{found}'")]
    TargetMismatch {
        model: ModelKey,
        field: String,
        expected: ModelKey,
        found: ModelKey,
    },

    #[error("{model}.{field} is a {kind} field; this operation needs a {expected} relation")]
    WrongFieldKind {
        model: ModelKey,
        field: String,
        kind: RelationKind,
        expected: &'static str,
    },
}

impl InstanceError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::AbstractModel(_) | Self::TargetMismatch { .. } | Self::WrongFieldKind { .. } => {
                ErrorClass::Unsupported
            }
            Self::AlreadyExists { .. } => ErrorClass::Conflict,
            Self::NotFound { .. } => ErrorClass::NotFound,
        }
    }
}

///
/// Db
///
/// A store plus the registry of models defined against it.
///

#[derive(Debug)]
pub struct Db<S: Store> {
    store: Arc<S>,
    registry: Arc<Registry>,
    config: RelationConfig,
}

impl<S: Store> Db<S> {
    /// Open a db with a fresh registry and the default config.
    pub fn new(store: S) -> Self {
        Self::from_parts(
            Arc::new(store),
            Arc::new(Registry::new()),
            RelationConfig::default(),
        )
    }

    /// Open a db with a fresh registry and a validated config.
    pub fn with_config(store: S, config: RelationConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self::from_parts(
            Arc::new(store),
            Arc::new(Registry::new()),
            config,
        ))
    }

    /// Assemble a db from shared parts, e.g. one registry over several stores.
    pub const fn from_parts(
        store: Arc<S>,
        registry: Arc<Registry>,
        config: RelationConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &RelationConfig {
        &self.config
    }

    /// Define a model. Related names and their uniqueness are checked now;
    /// relation targets are resolved on first use.
    pub fn define(&self, def: ModelDef) -> Result<Arc<Model>, Error> {
        self.registry.define(def, &self.config)
    }

    /// Look up a model by `namespace:name`.
    pub fn model(&self, qualified: &str) -> Result<Arc<Model>, Error> {
        Ok(self.registry.model_by_name(qualified)?)
    }

    /// Names of the reverse accessors installed on `model`.
    #[must_use]
    pub fn related_names(&self, model: &ModelKey) -> Vec<String> {
        if self.registry.model(model).is_none() {
            return Vec::new();
        }

        self.registry
            .relations_targeting(model)
            .iter()
            .map(|record| record.related_name().to_string())
            .collect()
    }

    /// The reverse accessor installed on `target` under `name`.
    ///
    /// Accessors only exist once the target model itself is defined.
    pub fn accessor(&self, target: &ModelKey, name: &str) -> Result<ReverseAccessor, Error> {
        let unknown = || RelationError::UnknownAccessor {
            model: target.clone(),
            name: name.to_string(),
        };

        if self.registry.model(target).is_none() {
            return Err(unknown().into());
        }
        let record = self.registry.relation(target, name).ok_or_else(unknown)?;

        // first use of the relation: pin its resolution
        if let Some(source) = self.registry.model(record.source()) {
            self.registry.resolve(&source, record.field())?;
        }

        Ok(ReverseAccessor::new(record))
    }

    /// Resolve every relation of every defined model.
    ///
    /// Call once all models are defined to surface `ModelNotFound` early.
    pub fn check_relations(&self) -> Result<usize, Error> {
        Ok(self.registry.resolve_all()?)
    }

    /// Create a record and return its handle.
    pub fn create(
        &self,
        model: &Arc<Model>,
        pk: impl Into<Pk>,
    ) -> Result<Instance<'_, S>, Error> {
        let pk = pk.into();
        Self::ensure_concrete(model)?;

        if !self.store.create(model.key(), &pk)? {
            return Err(InstanceError::AlreadyExists {
                model: model.key().clone(),
                pk,
            }
            .into());
        }

        Ok(Instance::new(self, Arc::clone(model), pk))
    }

    /// Handle to an existing record.
    pub fn instance(
        &self,
        model: &Arc<Model>,
        pk: impl Into<Pk>,
    ) -> Result<Instance<'_, S>, Error> {
        let pk = pk.into();
        Self::ensure_concrete(model)?;

        if !self.store.exists(model.key(), &pk)? {
            return Err(InstanceError::NotFound {
                model: model.key().clone(),
                pk,
            }
            .into());
        }

        Ok(Instance::new(self, Arc::clone(model), pk))
    }

    /// Handle to an existing record of the model named `namespace:name`.
    pub fn get(&self, qualified: &str, pk: impl Into<Pk>) -> Result<Instance<'_, S>, Error> {
        let model = self.model(qualified)?;

        self.instance(&model, pk)
    }

    /// Clear every reference to `model:pk`.
    ///
    /// Idempotent: run it again for the same key after a partial failure.
    pub fn cascade(&self, model: &ModelKey, pk: &Pk) -> Result<CascadeReport, Error> {
        let accessors: Vec<ReverseAccessor> = self
            .registry
            .relations_targeting(model)
            .into_iter()
            .map(ReverseAccessor::new)
            .collect();

        on_delete(&*self.store, &accessors, model, pk)
    }

    /// Cascade, then remove the record of `model:pk` with its relation fields.
    pub fn delete(&self, model: &Model, pk: &Pk) -> Result<CascadeReport, Error> {
        let report = self.cascade(model.key(), pk)?;

        let fields: Vec<(&str, _)> = model
            .relations()
            .iter()
            .map(|field| (field.name(), field.kind().storage()))
            .collect();
        self.store.delete(model.key(), pk, &fields)?;

        Ok(report)
    }

    // Resolve a field's target, caching it on first success.
    fn resolve<'f>(&self, field: &'f RelationField) -> Result<&'f ModelKey, RelationError> {
        field.resolve_in(&self.registry.models())
    }

    fn ensure_concrete(model: &Model) -> Result<(), InstanceError> {
        if model.is_abstract() {
            Err(InstanceError::AbstractModel(model.key().clone()))
        } else {
            Ok(())
        }
    }
}
