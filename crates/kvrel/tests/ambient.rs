use kvrel::{
    ErrorClass, ErrorOrigin,
    obs::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink},
    prelude::*,
    store::{LoggingMiddleware, Middleware, MiddlewareStore},
};
use std::sync::{Arc, Mutex};

#[test]
fn config_from_json_changes_default_names() {
    let config = RelationConfig::from_json(r#"{ "default_related_suffix": "_refs" }"#)
        .expect("config should parse");
    let db = Db::with_config(MemoryStore::new(), config).expect("config should validate");

    db.define(ModelDef::new("cfg", "Person"))
        .expect("Person should define");
    db.define(ModelDef::new("cfg", "Note").field(RelationFieldDef::fk_string("author", "Person")))
        .expect("Note should define");

    let person = ModelKey::parse("cfg:person").expect("key should parse");
    assert_eq!(db.related_names(&person), ["note_refs"]);
}

#[test]
fn config_rejects_unknown_and_invalid_settings() {
    let unknown = RelationConfig::from_json(r#"{ "self_marker": "me" }"#);
    assert!(unknown.is_err());

    let invalid: RelationConfig = serde_json::from_value(serde_json::json!({
        "default_related_suffix": "-set",
    }))
    .expect("shape is valid json");
    let err = Db::with_config(MemoryStore::new(), invalid).expect_err("suffix must be an identifier");
    assert_eq!(err.origin(), ErrorOrigin::Config);
}

#[test]
fn short_name_limit_rejects_long_related_names() {
    let config = RelationConfig {
        max_name_len: 8,
        ..RelationConfig::default()
    };
    let db = Db::with_config(MemoryStore::new(), config).expect("config should validate");

    let err = db
        .define(
            ModelDef::new("cfg", "Paragraph").field(RelationFieldDef::fk_string("doc", "Document")),
        )
        .expect_err("paragraph_set exceeds eight characters");

    assert!(err.is_invalid_related_name());
    assert_eq!(err.class(), ErrorClass::Unsupported);
}

#[test]
fn logging_middleware_sees_cascade_commands() {
    let logging = Arc::new(LoggingMiddleware::new(false));
    let store = MiddlewareStore::new(
        MemoryStore::new(),
        vec![logging.clone() as Arc<dyn Middleware>],
    )
    .expect("middleware should attach");
    let db = Db::new(store);

    let person = db
        .define(ModelDef::new("mw", "Person"))
        .expect("Person should define");
    let group = db
        .define(
            ModelDef::new("mw", "Group")
                .field(RelationFieldDef::fk_hash("owner", &person).related_name("owned_groups")),
        )
        .expect("Group should define");

    let alice = db.create(&person, "alice").expect("alice should create");
    db.create(&group, "g1")
        .expect("g1 should create")
        .set("owner", &alice)
        .expect("owner should set");
    let before = logging.commands_logged();

    alice.delete().expect("alice should delete");

    // query, clear_if, delete
    assert!(logging.commands_logged() >= before + 3);
}

#[derive(Default)]
struct Collect {
    events: Mutex<Vec<String>>,
}

impl MetricsSink for Collect {
    fn record(&self, event: MetricsEvent<'_>) {
        self.events
            .lock()
            .expect("collector lock should not be poisoned")
            .push(format!("{event:?}"));
    }
}

#[test]
fn metrics_sink_override_captures_relation_events() {
    let sink = Collect::default();

    with_metrics_sink(&sink, || {
        let db = Db::new(MemoryStore::new());
        let person = db
            .define(ModelDef::new("obs", "Person"))
            .expect("Person should define");
        db.define(
            ModelDef::new("obs", "Pet")
                .field(RelationFieldDef::fk_string("owner", &person).related_name("pets")),
        )
        .expect("Pet should define");

        db.create(&person, "p1")
            .expect("p1 should create")
            .related("pets")
            .expect("lookup should run");
    });

    let events = sink
        .events
        .lock()
        .expect("collector lock should not be poisoned");
    assert!(events.iter().any(|e| e.starts_with("ModelDefined")));
    assert!(events.iter().any(|e| e.starts_with("TargetResolved")));
    assert!(events.iter().any(|e| e.starts_with("ReverseLookup")));
}

#[test]
fn global_metrics_count_cascades_per_model() {
    metrics_reset_all();

    let db = Db::new(MemoryStore::new());
    let person = db
        .define(ModelDef::new("obs", "Person"))
        .expect("Person should define");
    let team = db
        .define(
            ModelDef::new("obs", "Team")
                .field(RelationFieldDef::m2m_set("members", &person).related_name("teams")),
        )
        .expect("Team should define");

    let p1 = db.create(&person, "p1").expect("p1 should create");
    db.create(&team, "t1")
        .expect("t1 should create")
        .add("members", &p1)
        .expect("member should add");
    p1.delete().expect("p1 should delete");

    let report = metrics_report(None);
    let counters = report.counters.expect("counters should be present");
    assert_eq!(counters.ops.models_defined, 2);
    assert_eq!(counters.ops.cascades, 1);
    assert_eq!(counters.ops.cascade_removes, 1);

    let person_summary = report
        .model_counters
        .iter()
        .find(|m| m.model == "obs:person")
        .expect("person should have counters");
    assert_eq!(person_summary.cascades, 1);
}
