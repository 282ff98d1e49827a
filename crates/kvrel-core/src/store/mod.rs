//! Module: store
//! Responsibility: the key-value boundary the relation engine consumes.
//! Does not own: relation policy; cascades only call these primitives.
//!
//! Invariants:
//! - Every mutating primitive is atomic against a single key.
//! - Mutations against a record that does not exist never create it.
//! - `query_by_field` reflects the current value of the field, uncached.

mod keys;
mod memory;
pub mod middleware;

pub use memory::MemoryStore;

use crate::{ErrorClass, model::ModelKey};
use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// Pk
///
/// Primary key of one stored record.
///

#[derive(
    Clone, Debug, Deref, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct Pk(String);

impl Pk {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Pk {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Pk {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Pk> for Pk {
    fn from(value: &Pk) -> Self {
        value.clone()
    }
}

///
/// FieldStorage
///
/// Physical layout of one field on a record.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum FieldStorage {
    /// Own string key per record.
    #[display("string")]
    String,
    /// One entry of the record hash.
    #[display("hash")]
    Hash,
    #[display("set")]
    Set,
    #[display("list")]
    List,
    #[display("sorted_set")]
    SortedSet,
}

impl FieldStorage {
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::Set | Self::List | Self::SortedSet)
    }
}

///
/// StoreError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("record '{model}:{pk}' does not exist")]
    MissingRecord { model: ModelKey, pk: Pk },

    #[error("key '{key}' holds a value of the wrong type (expected {expected})")]
    WrongType { key: String, expected: FieldStorage },
}

impl StoreError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Backend(_) => ErrorClass::Internal,
            Self::MissingRecord { .. } => ErrorClass::NotFound,
            Self::WrongType { .. } => ErrorClass::Corruption,
        }
    }
}

///
/// Store
///
/// Field-level primitives keyed by (model, pk, field) plus the
/// `query_by_field` lookup the reverse accessors delegate to.
///

pub trait Store: Send + Sync {
    /// Return true if a record with this pk exists.
    fn exists(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError>;

    /// Register a record. Returns false if it already existed.
    fn create(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError>;

    /// Read a single-valued field.
    fn get(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Option<String>, StoreError>;

    /// Write a single-valued field, returning the previous value.
    /// Fails with `MissingRecord` if the record does not exist.
    fn set(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        value: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Clear a single-valued field. Returns true if a value was removed.
    fn clear(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<bool, StoreError>;

    /// Clear a single-valued field only while it still holds `expected`.
    fn clear_if(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        expected: &str,
    ) -> Result<bool, StoreError>;

    /// Read a collection field in its stored order.
    fn members(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Vec<String>, StoreError>;

    /// Add one member to a collection. `score` orders sorted sets.
    /// Fails with `MissingRecord` if the record does not exist.
    fn add_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
        score: Option<f64>,
    ) -> Result<bool, StoreError>;

    /// Remove every occurrence of `member`, leaving others intact.
    fn remove_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
    ) -> Result<bool, StoreError>;

    /// Delete a record and every listed field. Returns false if it was absent.
    fn delete(
        &self,
        model: &ModelKey,
        pk: &Pk,
        fields: &[(&str, FieldStorage)],
    ) -> Result<bool, StoreError>;

    /// Pks of `model` records whose `field` holds (or contains) `value`.
    fn query_by_field(
        &self,
        model: &ModelKey,
        field: &str,
        value: &str,
    ) -> Result<BTreeSet<Pk>, StoreError>;
}

impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn exists(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError> {
        (**self).exists(model, pk)
    }

    fn create(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError> {
        (**self).create(model, pk)
    }

    fn get(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Option<String>, StoreError> {
        (**self).get(model, pk, field, storage)
    }

    fn set(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        value: &str,
    ) -> Result<Option<String>, StoreError> {
        (**self).set(model, pk, field, storage, value)
    }

    fn clear(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<bool, StoreError> {
        (**self).clear(model, pk, field, storage)
    }

    fn clear_if(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        expected: &str,
    ) -> Result<bool, StoreError> {
        (**self).clear_if(model, pk, field, storage, expected)
    }

    fn members(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Vec<String>, StoreError> {
        (**self).members(model, pk, field, storage)
    }

    fn add_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
        score: Option<f64>,
    ) -> Result<bool, StoreError> {
        (**self).add_member(model, pk, field, storage, member, score)
    }

    fn remove_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
    ) -> Result<bool, StoreError> {
        (**self).remove_member(model, pk, field, storage, member)
    }

    fn delete(
        &self,
        model: &ModelKey,
        pk: &Pk,
        fields: &[(&str, FieldStorage)],
    ) -> Result<bool, StoreError> {
        (**self).delete(model, pk, fields)
    }

    fn query_by_field(
        &self,
        model: &ModelKey,
        field: &str,
        value: &str,
    ) -> Result<BTreeSet<Pk>, StoreError> {
        (**self).query_by_field(model, field, value)
    }
}
