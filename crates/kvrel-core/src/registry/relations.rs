use crate::{
    model::{ModelKey, OnDelete, RelationField, RelationKind},
    relation::RelationError,
};
use std::{collections::BTreeMap, fmt};

///
/// RelationRecord
///
/// One installed reverse accessor: `target.related_name` answers with the
/// `source` records whose `field` references a target pk.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationRecord {
    target: ModelKey,
    related_name: String,
    source: ModelKey,
    field: String,
    kind: RelationKind,
    on_delete: OnDelete,
}

impl RelationRecord {
    pub(crate) fn from_field(field: &RelationField) -> Self {
        Self {
            target: field.target_key().clone(),
            related_name: field.related_name().to_string(),
            source: field.source().clone(),
            field: field.name().to_string(),
            kind: field.kind(),
            on_delete: field.on_delete(),
        }
    }

    #[must_use]
    pub const fn target(&self) -> &ModelKey {
        &self.target
    }

    #[must_use]
    pub fn related_name(&self) -> &str {
        &self.related_name
    }

    #[must_use]
    pub const fn source(&self) -> &ModelKey {
        &self.source
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    #[must_use]
    pub const fn on_delete(&self) -> OnDelete {
        self.on_delete
    }
}

impl fmt::Display for RelationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.field)
    }
}

///
/// RelationTable
///
/// Per-target map of related name to record. Append-only.
///

#[derive(Debug, Default)]
pub struct RelationTable {
    by_target: BTreeMap<ModelKey, BTreeMap<String, RelationRecord>>,
}

impl RelationTable {
    #[must_use]
    pub fn get(&self, target: &ModelKey, name: &str) -> Option<&RelationRecord> {
        self.by_target.get(target)?.get(name)
    }

    /// Every record targeting `target`, ordered by related name.
    pub fn targeting(&self, target: &ModelKey) -> impl Iterator<Item = &RelationRecord> {
        self.by_target.get(target).into_iter().flat_map(BTreeMap::values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_target.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }

    /// Check a batch against the table and against itself.
    pub(crate) fn check(&self, incoming: &[RelationRecord]) -> Result<(), RelationError> {
        for (i, record) in incoming.iter().enumerate() {
            let existing = self
                .get(&record.target, &record.related_name)
                .or_else(|| {
                    incoming[..i].iter().find(|earlier| {
                        earlier.target == record.target
                            && earlier.related_name == record.related_name
                    })
                });

            if let Some(existing) = existing {
                return Err(RelationError::DuplicateRelatedName {
                    target: record.target.clone(),
                    name: record.related_name.clone(),
                    existing: existing.to_string(),
                    incoming: record.to_string(),
                });
            }
        }

        Ok(())
    }

    // Callers run `check` first under the same write lock.
    pub(crate) fn insert(&mut self, record: RelationRecord) {
        self.by_target
            .entry(record.target.clone())
            .or_default()
            .entry(record.related_name.clone())
            .or_insert(record);
    }
}
