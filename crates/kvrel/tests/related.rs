use kvrel::{Error, ErrorClass, prelude::*};
use std::{collections::BTreeSet, sync::Arc};

const NS: &str = "related-tests";

struct Models {
    db: Db<MemoryStore>,
    person: Arc<Model>,
    group: Arc<Model>,
}

fn setup() -> Models {
    let db = Db::new(MemoryStore::new());
    let person = db
        .define(ModelDef::new(NS, "Person"))
        .expect("Person should define");
    let group = db
        .define(
            ModelDef::new(NS, "Group")
                .field(RelationFieldDef::fk_hash("owner", &person).related_name("owned_groups"))
                .field(RelationFieldDef::fk_string("parent", "self").related_name("children"))
                .field(RelationFieldDef::m2m_set("members", "Person").related_name("membership")),
        )
        .expect("Group should define");

    Models { db, person, group }
}

fn pks(values: &[&str]) -> BTreeSet<Pk> {
    values.iter().map(|v| Pk::from(*v)).collect()
}

#[test]
fn every_target_form_designates_the_same_model() {
    let Models { db, person, .. } = setup();
    let targets: [TargetSpec; 4] = [
        TargetSpec::from(&person),
        TargetSpec::from("Person"),
        TargetSpec::from("related-tests:Person"),
        TargetSpec::from(person.key()),
    ];

    for (i, target) in targets.into_iter().enumerate() {
        let name = format!("by_form_{i}");
        let model = db
            .define(
                ModelDef::new(NS, format!("Ref{i}"))
                    .field(RelationFieldDef::fk_string("person", target).related_name(name.as_str())),
            )
            .expect("referencing model should define");

        let field = model.relation("person").expect("field should be bound");
        assert_eq!(field.target_key(), person.key());
        assert!(db.related_names(person.key()).contains(&name));
    }
}

#[test]
fn members_and_owners_are_reachable_from_the_person() {
    let Models { db, person, group } = setup();
    let core_devs = db.create(&group, "core-devs").expect("group should create");
    let testers = db.create(&group, "testers").expect("group should create");
    let ybon = db.create(&person, "ybon").expect("person should create");
    let twidi = db.create(&person, "twidi").expect("person should create");

    core_devs.set("owner", &ybon).expect("owner should set");
    testers.set("owner", &twidi).expect("owner should set");
    core_devs.add("members", &ybon).expect("member should add");
    core_devs.add("members", &twidi).expect("member should add");
    testers.add("members", &twidi).expect("member should add");

    assert_eq!(
        ybon.related("owned_groups").expect("lookup should run"),
        pks(&["core-devs"])
    );
    assert_eq!(
        twidi.related("membership").expect("lookup should run"),
        pks(&["core-devs", "testers"])
    );

    testers.remove("members", &twidi).expect("member should remove");
    assert_eq!(
        twidi.related("membership").expect("lookup should run"),
        pks(&["core-devs"])
    );
}

#[test]
fn deleting_a_person_updates_every_group() {
    let Models { db, person, group } = setup();
    let core_devs = db.create(&group, "core-devs").expect("group should create");
    let ybon = db.create(&person, "ybon").expect("person should create");
    let twidi = db.create(&person, "twidi").expect("person should create");

    core_devs.set("owner", &ybon).expect("owner should set");
    core_devs.add("members", &ybon).expect("member should add");
    core_devs.add("members", &twidi).expect("member should add");

    let report = ybon.delete().expect("ybon should delete");
    assert_eq!(report.cleared, 1);
    assert_eq!(report.removed, 1);

    assert_eq!(core_devs.get("owner").expect("owner should read"), None);
    assert_eq!(
        core_devs.members("members").expect("members should read"),
        vec![Pk::from("twidi")]
    );
}

#[test]
fn groups_nest_through_parent() {
    let Models { db, group, .. } = setup();
    let root = db.create(&group, "root").expect("group should create");
    let child = db.create(&group, "child").expect("group should create");

    child.set("parent", &root).expect("parent should set");
    assert_eq!(
        root.related("children").expect("lookup should run"),
        pks(&["child"])
    );

    let looked_up = db
        .get("related-tests:group", "child")
        .expect("child should be found by name");
    assert_eq!(
        looked_up.get("parent").expect("parent should read"),
        Some(Pk::from("root"))
    );
}

#[test]
fn related_name_collision_is_a_conflict() {
    let Models { db, person, .. } = setup();

    let err = db
        .define(
            ModelDef::new(NS, "Club")
                .field(RelationFieldDef::m2m_list("members", &person).related_name("membership")),
        )
        .expect_err("membership is already installed on Person");

    assert!(err.is_duplicate_related_name());
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert!(db.model("related-tests:club").is_err());
}

#[test]
fn unknown_target_surfaces_on_first_use() {
    let Models { db, .. } = setup();
    let badge = db
        .define(
            ModelDef::new(NS, "Badge").field(RelationFieldDef::fk_string("holder", "other:Holder")),
        )
        .expect("definition should not need the target");
    let b1 = db.create(&badge, "b1").expect("badge should create");

    let err = b1.set("holder", "h1").expect_err("other:holder is undefined");
    assert!(err.is_model_not_found());
    assert_eq!(err.class(), ErrorClass::NotFound);

    let check = db.check_relations().expect_err("check should report it too");
    assert!(matches!(check, Error::Relation(_)));
}

#[test]
fn subclasses_get_their_own_accessors() {
    let db = Db::new(MemoryStore::new());
    let ns = "related-name-sub";
    db.define(ModelDef::new(ns, "Other"))
        .expect("Other should define");
    db.define(
        ModelDef::new(ns, "Base").abstract_model().field(
            RelationFieldDef::fk_string("a_field", "Other")
                .related_name("%(namespace)s_%(model)s_related"),
        ),
    )
    .expect("Base should define");
    let child_a = db
        .define(ModelDef::new(ns, "ChildA").extends("Base"))
        .expect("ChildA should define");
    let child_b = db
        .define(ModelDef::new(ns, "ChildB").extends("Base"))
        .expect("ChildB should define");

    let other = db.model("related-name-sub:other").expect("Other is defined");
    let o1 = db.create(&other, "o1").expect("other should create");
    db.create(&child_a, "a1")
        .expect("a1 should create")
        .set("a_field", &o1)
        .expect("a_field should set");
    db.create(&child_b, "b1")
        .expect("b1 should create")
        .set("a_field", &o1)
        .expect("a_field should set");

    assert_eq!(
        o1.related("related_name_sub_childa_related")
            .expect("lookup should run"),
        pks(&["a1"])
    );
    assert_eq!(
        o1.related("related_name_sub_childb_related")
            .expect("lookup should run"),
        pks(&["b1"])
    );
}
