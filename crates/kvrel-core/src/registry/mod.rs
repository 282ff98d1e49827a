//! Module: registry
//! Responsibility: the model table and the relation table, and atomic
//! definition of new models into both.
//! Does not own: name building or target resolution rules (see `relation`).
//!
//! Invariants:
//! - Both tables are append-only.
//! - For a fixed target, no two relation records share a related name.
//! - A rejected definition leaves both tables untouched.

mod models;
mod relations;


pub use models::ModelTable;
pub use relations::{RelationRecord, RelationTable};

use crate::{
    Error, ErrorClass,
    config::RelationConfig,
    model::{IdentityError, Model, ModelDef, ModelIdentity, ModelKey, RelationFieldDef},
    obs::sink::{MetricsEvent, record},
    relation::RelationError,
};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum RegistryError {
    #[error("model '{0}' is already defined")]
    DuplicateModel(ModelKey),

    #[error("invalid model name: {0}")]
    InvalidModelName(#[from] IdentityError),

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("model '{model}' extends unknown model '{base}'")]
    UnknownBaseModel { model: ModelKey, base: ModelKey },
}

impl RegistryError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateModel(_) => ErrorClass::Conflict,
            Self::InvalidModelName(_) => ErrorClass::Unsupported,
            Self::ModelNotFound(_) | Self::UnknownBaseModel { .. } => ErrorClass::NotFound,
        }
    }
}

///
/// Registry
///
/// Explicit, shareable replacement for process-wide model and relation
/// tables. Lock order is always models, then relations.
///

#[derive(Debug, Default)]
pub struct Registry {
    models: RwLock<ModelTable>,
    relations: RwLock<RelationTable>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a model with all its relations, or nothing.
    pub fn define(&self, def: ModelDef, config: &RelationConfig) -> Result<Arc<Model>, Error> {
        let identity = ModelIdentity::new(def.namespace(), def.name())
            .map_err(RegistryError::InvalidModelName)?;

        let key = identity.key().clone();

        let mut models = self.models_mut();
        let mut relations = self.relations_mut();

        let (model, records) = match stage(identity, &def, &models, &relations, config) {
            Ok(staged) => staged,
            Err(err) => {
                log::debug!("rejected model {key}: {err}");
                record(MetricsEvent::DefinitionRejected {
                    model: key.as_str(),
                });
                return Err(err);
            }
        };

        let model = Arc::new(model);
        let count = records.len();
        models.insert(Arc::clone(&model));
        for relation in records {
            relations.insert(relation);
        }

        log::debug!(
            "defined model {} ({count} relations{})",
            model.identity(),
            if model.is_abstract() { ", abstract" } else { "" }
        );
        record(MetricsEvent::ModelDefined {
            model: model.key().as_str(),
            relations: u64::try_from(count).unwrap_or(u64::MAX),
        });

        Ok(model)
    }

    /// Look up a model by canonical key.
    #[must_use]
    pub fn model(&self, key: &ModelKey) -> Option<Arc<Model>> {
        self.models().get(key).cloned()
    }

    /// Look up a model by `namespace:name`, case-insensitively.
    pub fn model_by_name(&self, qualified: &str) -> Result<Arc<Model>, RegistryError> {
        let key = ModelKey::parse(qualified)?;

        self.model(&key)
            .ok_or_else(|| RegistryError::ModelNotFound(qualified.to_string()))
    }

    /// Every relation record whose target is `target`.
    #[must_use]
    pub fn relations_targeting(&self, target: &ModelKey) -> Vec<RelationRecord> {
        self.relations().targeting(target).cloned().collect()
    }

    /// The record installed as `target.name`, if any.
    #[must_use]
    pub fn relation(&self, target: &ModelKey, name: &str) -> Option<RelationRecord> {
        self.relations().get(target, name).cloned()
    }

    /// Resolve one bound relation field against the model table.
    pub fn resolve(&self, model: &Model, field: &str) -> Result<ModelKey, RelationError> {
        let Some(relation) = model.relation(field) else {
            return Err(RelationError::UnknownField {
                model: model.key().clone(),
                field: field.to_string(),
            });
        };

        relation.resolve_in(&self.models()).cloned()
    }

    /// Resolve every bound relation field of every model.
    pub fn resolve_all(&self) -> Result<usize, RelationError> {
        let models = self.models();
        let mut resolved = 0;
        for model in models.iter() {
            for relation in model.relations() {
                relation.resolve_in(&models)?;
                resolved += 1;
            }
        }

        Ok(resolved)
    }

    pub(crate) fn models(&self) -> RwLockReadGuard<'_, ModelTable> {
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn models_mut(&self) -> RwLockWriteGuard<'_, ModelTable> {
        self.models.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn relations(&self) -> RwLockReadGuard<'_, RelationTable> {
        self.relations.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn relations_mut(&self) -> RwLockWriteGuard<'_, RelationTable> {
        self.relations.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// Build the model and its relation records without touching either table.
fn stage(
    identity: ModelIdentity,
    def: &ModelDef,
    models: &ModelTable,
    relations: &RelationTable,
    config: &RelationConfig,
) -> Result<(Model, Vec<RelationRecord>), Error> {
    let key = identity.key().clone();
    if models.contains(&key) {
        return Err(RegistryError::DuplicateModel(key).into());
    }

    let base = match def.base() {
        None => None,
        Some(spec) => {
            let base_key = spec
                .canonical_key(&key)
                .map_err(RegistryError::InvalidModelName)?;
            let Some(base) = models.get(&base_key) else {
                return Err(RegistryError::UnknownBaseModel {
                    model: key,
                    base: base_key,
                }
                .into());
            };
            Some(Arc::clone(base))
        }
    };

    let declared = merge_declarations(&key, base.as_deref(), def.fields())?;

    let fields = if def.is_abstract() {
        Vec::new()
    } else {
        declared
            .iter()
            .map(|decl| decl.bind(&identity, config))
            .collect::<Result<Vec<_>, _>>()?
    };

    let records: Vec<RelationRecord> = fields.iter().map(RelationRecord::from_field).collect();
    relations.check(&records)?;

    let model = Model::new(
        identity,
        def.is_abstract(),
        base.map(|b| b.key().clone()),
        declared,
        fields,
    );

    Ok((model, records))
}

// Inherited declarations first, in base order; an own field with the same
// name replaces the inherited one in place.
fn merge_declarations(
    model: &ModelKey,
    base: Option<&Model>,
    own: &[RelationFieldDef],
) -> Result<Vec<RelationFieldDef>, RelationError> {
    let mut merged: Vec<RelationFieldDef> = base.map(|b| b.declared().to_vec()).unwrap_or_default();
    let inherited = merged.len();

    for (i, field) in own.iter().enumerate() {
        if own[..i].iter().any(|earlier| earlier.name() == field.name()) {
            return Err(RelationError::DuplicateField {
                model: model.clone(),
                field: field.name().to_string(),
            });
        }

        match merged[..inherited]
            .iter()
            .position(|existing| existing.name() == field.name())
        {
            Some(pos) => merged[pos] = field.clone(),
            None => merged.push(field.clone()),
        }
    }

    Ok(merged)
}
