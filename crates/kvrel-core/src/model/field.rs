use crate::{
    MAX_NAME_LEN,
    config::RelationConfig,
    model::{ModelIdentity, ModelKey},
    registry::ModelTable,
    relation::{
        RelationError, TargetSpec, build_related_name, resolve_target, validate_identifier,
    },
    store::FieldStorage,
};
use derive_more::Display;
use once_cell::sync::OnceCell;

///
/// RelationKind
///
/// How a relation value is stored on the source record.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum RelationKind {
    /// Single value held in its own string key.
    #[display("fk_string")]
    FkString,
    /// Single value held as one field of the record hash.
    #[display("fk_hash")]
    FkHash,
    #[display("m2m_set")]
    M2mSet,
    #[display("m2m_list")]
    M2mList,
    #[display("m2m_sorted_set")]
    M2mSortedSet,
}

impl RelationKind {
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::M2mSet | Self::M2mList | Self::M2mSortedSet)
    }

    #[must_use]
    pub const fn storage(self) -> FieldStorage {
        match self {
            Self::FkString => FieldStorage::String,
            Self::FkHash => FieldStorage::Hash,
            Self::M2mSet => FieldStorage::Set,
            Self::M2mList => FieldStorage::List,
            Self::M2mSortedSet => FieldStorage::SortedSet,
        }
    }
}

///
/// OnDelete
///
/// What happens to referencing records when a target instance is deleted.
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
pub enum OnDelete {
    /// Clear single values, remove collection members.
    #[default]
    #[display("clear")]
    Clear,
    /// Refuse the delete while any reference exists.
    #[display("restrict")]
    Restrict,
}

///
/// RelationFieldDef
///
/// Declared relation field. On an abstract model this is a template that
/// every concrete subclass binds to its own identity.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationFieldDef {
    name: String,
    kind: RelationKind,
    to: TargetSpec,
    related_name: Option<String>,
    on_delete: OnDelete,
}

impl RelationFieldDef {
    pub fn new(name: impl Into<String>, kind: RelationKind, to: impl Into<TargetSpec>) -> Self {
        Self {
            name: name.into(),
            kind,
            to: to.into(),
            related_name: None,
            on_delete: OnDelete::default(),
        }
    }

    pub fn fk_string(name: impl Into<String>, to: impl Into<TargetSpec>) -> Self {
        Self::new(name, RelationKind::FkString, to)
    }

    pub fn fk_hash(name: impl Into<String>, to: impl Into<TargetSpec>) -> Self {
        Self::new(name, RelationKind::FkHash, to)
    }

    pub fn m2m_set(name: impl Into<String>, to: impl Into<TargetSpec>) -> Self {
        Self::new(name, RelationKind::M2mSet, to)
    }

    pub fn m2m_list(name: impl Into<String>, to: impl Into<TargetSpec>) -> Self {
        Self::new(name, RelationKind::M2mList, to)
    }

    pub fn m2m_sorted_set(name: impl Into<String>, to: impl Into<TargetSpec>) -> Self {
        Self::new(name, RelationKind::M2mSortedSet, to)
    }

    /// Set the reverse accessor name, optionally with `%(namespace)s` / `%(model)s`.
    #[must_use]
    pub fn related_name(mut self, pattern: impl Into<String>) -> Self {
        self.related_name = Some(pattern.into());
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, on_delete: OnDelete) -> Self {
        self.on_delete = on_delete;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    #[must_use]
    pub const fn target(&self) -> &TargetSpec {
        &self.to
    }

    #[must_use]
    pub fn related_name_pattern(&self) -> Option<&str> {
        self.related_name.as_deref()
    }

    /// Bind this declaration to one concrete source model.
    ///
    /// The field name is checked and the related name and canonical target
    /// key are computed here; only the registry existence check of the
    /// target is deferred.
    pub(crate) fn bind(
        &self,
        source: &ModelIdentity,
        config: &RelationConfig,
    ) -> Result<RelationField, RelationError> {
        validate_identifier(&self.name, MAX_NAME_LEN).map_err(|err| {
            RelationError::InvalidFieldName {
                model: source.key().clone(),
                field: self.name.clone(),
                err,
            }
        })?;

        let target_key =
            self.to
                .canonical_key(source.key())
                .map_err(|err| RelationError::InvalidTarget {
                    model: source.key().clone(),
                    field: self.name.clone(),
                    err,
                })?;

        let related_name = build_related_name(self.related_name.as_deref(), source, config)
            .map_err(|err| RelationError::InvalidRelatedName {
                model: source.key().clone(),
                field: self.name.clone(),
                err,
            })?;

        Ok(RelationField {
            source: source.key().clone(),
            name: self.name.clone(),
            kind: self.kind,
            target: self.to.clone(),
            target_key,
            related_name,
            on_delete: self.on_delete,
            resolved: OnceCell::new(),
        })
    }
}

///
/// RelationField
///
/// Relation field bound to a concrete source model.
///

#[derive(Debug)]
pub struct RelationField {
    source: ModelKey,
    name: String,
    kind: RelationKind,
    target: TargetSpec,
    target_key: ModelKey,
    related_name: String,
    on_delete: OnDelete,
    resolved: OnceCell<ModelKey>,
}

impl RelationField {
    #[must_use]
    pub const fn source(&self) -> &ModelKey {
        &self.source
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    #[must_use]
    pub const fn target_spec(&self) -> &TargetSpec {
        &self.target
    }

    /// Canonical key the target spec designates, whether or not it exists yet.
    #[must_use]
    pub const fn target_key(&self) -> &ModelKey {
        &self.target_key
    }

    #[must_use]
    pub fn related_name(&self) -> &str {
        &self.related_name
    }

    #[must_use]
    pub const fn on_delete(&self) -> OnDelete {
        self.on_delete
    }

    /// Return the target if it has already been resolved.
    #[must_use]
    pub fn resolved_target(&self) -> Option<&ModelKey> {
        self.resolved.get()
    }

    /// Resolve the target against the model table, at most once.
    ///
    /// A failed attempt caches nothing, so a later call after the target
    /// has been defined succeeds.
    pub(crate) fn resolve_in(&self, models: &ModelTable) -> Result<&ModelKey, RelationError> {
        self.resolved.get_or_try_init(|| resolve_target(self, models))
    }
}
