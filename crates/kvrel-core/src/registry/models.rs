use crate::model::{Model, ModelKey};
use std::{collections::BTreeMap, sync::Arc};

///
/// ModelTable
///
/// Append-only map of canonical key to model descriptor.
///

#[derive(Debug, Default)]
pub struct ModelTable {
    models: BTreeMap<ModelKey, Arc<Model>>,
}

impl ModelTable {
    #[must_use]
    pub fn get(&self, key: &ModelKey) -> Option<&Arc<Model>> {
        self.models.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &ModelKey) -> bool {
        self.models.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Model>> {
        self.models.values()
    }

    // Callers check for duplicates first; the table never replaces.
    pub(crate) fn insert(&mut self, model: Arc<Model>) {
        self.models.entry(model.key().clone()).or_insert(model);
    }
}
