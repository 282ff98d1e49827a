use crate::{
    model::{ModelIdentity, ModelKey, RelationField, RelationFieldDef},
    relation::TargetSpec,
};

///
/// ModelDef
///
/// Declaration of a model before it is registered.
///

#[derive(Clone, Debug)]
pub struct ModelDef {
    namespace: String,
    name: String,
    is_abstract: bool,
    base: Option<TargetSpec>,
    fields: Vec<RelationFieldDef>,
}

impl ModelDef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            is_abstract: false,
            base: None,
            fields: Vec::new(),
        }
    }

    /// Mark the model abstract: it can be extended but owns no records.
    #[must_use]
    pub const fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Inherit the relation declarations of `base`.
    /// A bare name is looked up in this model's namespace.
    #[must_use]
    pub fn extends(mut self, base: impl Into<TargetSpec>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: RelationFieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub const fn base(&self) -> Option<&TargetSpec> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn fields(&self) -> &[RelationFieldDef] {
        &self.fields
    }
}

///
/// Model
///
/// Registered model descriptor. Declarations include inherited ones;
/// bound relation fields exist only on concrete models.
///

#[derive(Debug)]
pub struct Model {
    identity: ModelIdentity,
    is_abstract: bool,
    base: Option<ModelKey>,
    declared: Vec<RelationFieldDef>,
    relations: Vec<RelationField>,
}

impl Model {
    pub(crate) const fn new(
        identity: ModelIdentity,
        is_abstract: bool,
        base: Option<ModelKey>,
        declared: Vec<RelationFieldDef>,
        relations: Vec<RelationField>,
    ) -> Self {
        Self {
            identity,
            is_abstract,
            base,
            declared,
            relations,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    #[must_use]
    pub const fn key(&self) -> &ModelKey {
        self.identity.key()
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub const fn base(&self) -> Option<&ModelKey> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn declared(&self) -> &[RelationFieldDef] {
        &self.declared
    }

    #[must_use]
    pub fn relations(&self) -> &[RelationField] {
        &self.relations
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationField> {
        self.relations.iter().find(|field| field.name() == name)
    }
}
