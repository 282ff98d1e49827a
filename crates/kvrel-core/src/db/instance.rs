use crate::{
    Error,
    db::{Db, InstanceError},
    model::{Model, ModelKey, RelationField},
    relation::{CascadeReport, RelationError},
    store::{Pk, Store},
};
use std::{collections::BTreeSet, sync::Arc};

///
/// RelationValue
///
/// Value assigned to a relation field: a bare pk, or an instance whose
/// model is checked against the field's target.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationValue {
    Pk(Pk),
    Instance { model: ModelKey, pk: Pk },
}

impl From<&str> for RelationValue {
    fn from(value: &str) -> Self {
        Self::Pk(Pk::from(value))
    }
}

impl From<String> for RelationValue {
    fn from(value: String) -> Self {
        Self::Pk(Pk::from(value))
    }
}

impl From<Pk> for RelationValue {
    fn from(pk: Pk) -> Self {
        Self::Pk(pk)
    }
}

impl From<&Pk> for RelationValue {
    fn from(pk: &Pk) -> Self {
        Self::Pk(pk.clone())
    }
}

impl<S: Store> From<&Instance<'_, S>> for RelationValue {
    fn from(instance: &Instance<'_, S>) -> Self {
        Self::Instance {
            model: instance.model.key().clone(),
            pk: instance.pk.clone(),
        }
    }
}

///
/// Instance
///
/// Handle to one stored record of a concrete model.
///

#[derive(Debug)]
pub struct Instance<'db, S: Store> {
    db: &'db Db<S>,
    model: Arc<Model>,
    pk: Pk,
}

impl<'db, S: Store> Instance<'db, S> {
    pub(super) const fn new(db: &'db Db<S>, model: Arc<Model>, pk: Pk) -> Self {
        Self { db, model, pk }
    }

    #[must_use]
    pub const fn pk(&self) -> &Pk {
        &self.pk
    }

    #[must_use]
    pub const fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Point a single-valued relation at `value`. Returns the previous pk.
    pub fn set(
        &self,
        field: &str,
        value: impl Into<RelationValue>,
    ) -> Result<Option<Pk>, Error> {
        let relation = self.single(field)?;
        let pk = self.value_pk(relation, value.into())?;

        let previous = self.db.store().set(
            self.model.key(),
            &self.pk,
            field,
            relation.kind().storage(),
            pk.as_str(),
        )?;

        Ok(previous.map(Pk::from))
    }

    /// Read a single-valued relation.
    pub fn get(&self, field: &str) -> Result<Option<Pk>, Error> {
        let relation = self.single(field)?;

        let value = self.db.store().get(
            self.model.key(),
            &self.pk,
            field,
            relation.kind().storage(),
        )?;

        Ok(value.map(Pk::from))
    }

    /// Empty a single-valued relation. Returns true if it held a value.
    pub fn clear(&self, field: &str) -> Result<bool, Error> {
        let relation = self.single(field)?;

        Ok(self.db.store().clear(
            self.model.key(),
            &self.pk,
            field,
            relation.kind().storage(),
        )?)
    }

    /// Add a member to a collection relation.
    pub fn add(&self, field: &str, value: impl Into<RelationValue>) -> Result<bool, Error> {
        self.add_member(field, value.into(), None)
    }

    /// Add a member to a sorted-set relation with an explicit score.
    pub fn add_scored(
        &self,
        field: &str,
        value: impl Into<RelationValue>,
        score: f64,
    ) -> Result<bool, Error> {
        self.add_member(field, value.into(), Some(score))
    }

    /// Remove a member from a collection relation, leaving others intact.
    pub fn remove(&self, field: &str, value: impl Into<RelationValue>) -> Result<bool, Error> {
        let relation = self.collection(field)?;
        let pk = self.value_pk(relation, value.into())?;

        Ok(self.db.store().remove_member(
            self.model.key(),
            &self.pk,
            field,
            relation.kind().storage(),
            pk.as_str(),
        )?)
    }

    /// Members of a collection relation in stored order.
    pub fn members(&self, field: &str) -> Result<Vec<Pk>, Error> {
        let relation = self.collection(field)?;

        let members = self.db.store().members(
            self.model.key(),
            &self.pk,
            field,
            relation.kind().storage(),
        )?;

        Ok(members.into_iter().map(Pk::from).collect())
    }

    /// Call the reverse accessor `name` installed on this model.
    pub fn related(&self, name: &str) -> Result<BTreeSet<Pk>, Error> {
        let accessor = self.db.accessor(self.model.key(), name)?;

        Ok(accessor.call(self.db.store(), &self.pk)?)
    }

    /// Delete the record: clear references to it, then remove it.
    pub fn delete(self) -> Result<CascadeReport, Error> {
        self.db.delete(&self.model, &self.pk)
    }

    fn add_member(
        &self,
        field: &str,
        value: RelationValue,
        score: Option<f64>,
    ) -> Result<bool, Error> {
        let relation = self.collection(field)?;
        let pk = self.value_pk(relation, value)?;

        Ok(self.db.store().add_member(
            self.model.key(),
            &self.pk,
            field,
            relation.kind().storage(),
            pk.as_str(),
            score,
        )?)
    }

    fn relation(&self, field: &str) -> Result<&RelationField, RelationError> {
        self.model
            .relation(field)
            .ok_or_else(|| RelationError::UnknownField {
                model: self.model.key().clone(),
                field: field.to_string(),
            })
    }

    fn single(&self, field: &str) -> Result<&RelationField, Error> {
        let relation = self.relation(field)?;
        if relation.kind().is_collection() {
            return Err(self.wrong_kind(relation, "single-valued").into());
        }

        Ok(relation)
    }

    fn collection(&self, field: &str) -> Result<&RelationField, Error> {
        let relation = self.relation(field)?;
        if !relation.kind().is_collection() {
            return Err(self.wrong_kind(relation, "collection").into());
        }

        Ok(relation)
    }

    fn wrong_kind(&self, relation: &RelationField, expected: &'static str) -> InstanceError {
        InstanceError::WrongFieldKind {
            model: self.model.key().clone(),
            field: relation.name().to_string(),
            kind: relation.kind(),
            expected,
        }
    }

    // Resolve the field target (first use) and check the value against it.
    fn value_pk(&self, relation: &RelationField, value: RelationValue) -> Result<Pk, Error> {
        let target = self.db.resolve(relation)?;

        match value {
            RelationValue::Pk(pk) => Ok(pk),
            RelationValue::Instance { model, pk } if &model == target => Ok(pk),
            RelationValue::Instance { model, .. } => Err(InstanceError::TargetMismatch {
                model: self.model.key().clone(),
                field: relation.name().to_string(),
                expected: target.clone(),
                found: model,
            }
            .into()),
        }
    }
}
