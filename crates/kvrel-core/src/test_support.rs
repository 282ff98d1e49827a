use crate::{
    db::Db,
    model::{Model, ModelDef, ModelKey, RelationFieldDef},
    store::MemoryStore,
};
use std::sync::Arc;

pub(crate) const NS: &str = "related-tests";

pub(crate) fn memory_db() -> Db<MemoryStore> {
    Db::new(MemoryStore::new())
}

pub(crate) fn key(qualified: &str) -> ModelKey {
    ModelKey::parse(qualified).expect("test key should parse")
}

///
/// Fixture
///
/// `Person` plus a `Group` owning, parenting, and listing people.
///

pub(crate) struct Fixture {
    pub(crate) db: Db<MemoryStore>,
    pub(crate) person: Arc<Model>,
    pub(crate) group: Arc<Model>,
}

pub(crate) fn fixture() -> Fixture {
    let db = memory_db();
    let person = db
        .define(ModelDef::new(NS, "Person"))
        .expect("Person should define");
    let group = db
        .define(
            ModelDef::new(NS, "Group")
                .field(RelationFieldDef::fk_hash("owner", &person).related_name("owned_groups"))
                .field(RelationFieldDef::fk_string("parent", "self").related_name("children"))
                .field(RelationFieldDef::m2m_set("members", &person).related_name("membership")),
        )
        .expect("Group should define");

    Fixture { db, person, group }
}
