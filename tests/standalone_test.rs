//! 同步组装模式的集成测试

use rat_standalone::model::RemoteContext;
use rat_standalone::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn write_schema(dir: &Path, file: &str, content: serde_json::Value) {
    fs::write(dir.join(file), serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn write_a_and_b(dir: &Path) {
    write_schema(dir, "A.json", json!({"name": "A", "properties": {"id": "number"}}));
    write_schema(
        dir,
        "B.json",
        json!({
            "name": "B",
            "properties": {"id": "number"},
            "relations": {"a": {"type": "belongsTo", "model": "A", "foreignKey": "aId"}}
        }),
    );
}

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_two_schema_files_with_belongs_to() {
    init();
    let dir = tempfile::tempdir().unwrap();
    write_a_and_b(dir.path());

    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .models_path(dir.path())
        .build()
        .unwrap();
    let models = run(config).unwrap().into_models().unwrap();

    assert_eq!(models.names(), vec!["A".to_string(), "B".to_string()]);
    let accessor = models["B"].relation("a").expect("relation a");
    assert_eq!(accessor.target(), "A");
    assert_eq!(accessor.foreign_key(), "aId");

    let a = models["A"].create(record(json!({"id": 7}))).await.unwrap();
    let b = models["B"].create(record(json!({"id": 1, "aId": 7}))).await.unwrap();

    let related = models["B"].related(&b, "a").await.unwrap().one().unwrap();
    assert_eq!(related.get("id"), a.get("id"));
}

#[test]
fn test_key_set_matches_schema_names() {
    let dir = tempfile::tempdir().unwrap();
    write_a_and_b(dir.path());
    write_schema(dir.path(), "C.json", json!({"name": "Customer", "properties": {"email": "string"}}));
    fs::write(dir.path().join("README.md"), "not a schema").unwrap();

    let schemas = load_schemas(dir.path()).unwrap();
    let mut expected: Vec<String> = schemas.iter().map(|s| s.name.clone()).collect();
    expected.sort();

    let models = assemble(
        &StandaloneConfig::builder()
            .connector(memory_profile("main"))
            .models_path(dir.path())
            .build()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(models.names(), expected);
}

#[test]
fn test_unreadable_models_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .models_path(dir.path().join("missing"))
        .build()
        .unwrap();

    assert!(matches!(assemble(&config), Err(StandaloneError::IoError(_))));
}

#[test]
fn test_malformed_schema_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("A.json"), "{ not json").unwrap();
    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .models_path(dir.path())
        .build()
        .unwrap();

    assert!(matches!(assemble(&config), Err(StandaloneError::ParseError { .. })));
}

#[test]
fn test_registered_mixin_is_applied() {
    let applied = Arc::new(AtomicUsize::new(0));
    let counter = applied.clone();
    let mixins = MixinRegistry::new().with("Timestamp", move |model, options| {
        counter.fetch_add(1, Ordering::SeqCst);
        let field = options.get("field").and_then(|v| v.as_str()).unwrap_or("updatedAt");
        model.define_property(field, PropertyDefinition::new(PropertyType::Date));
        Ok(())
    });

    let descriptor = SchemaDescriptor::new("Note")
        .property("title", PropertyDefinition::new(PropertyType::String))
        .mixin("Timestamp", json!({"field": "createdAt"}))
        .mixin("RemoteRouting", json!({"disable": ["deleteById"]}));

    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .schemas(vec![descriptor])
        .mixins(mixins)
        .build()
        .unwrap();
    let models = assemble(&config).unwrap();

    assert_eq!(applied.load(Ordering::SeqCst), 1);
    assert_eq!(models["Note"].mixins(), vec!["Timestamp".to_string()]);
    assert!(models["Note"].definition().properties.contains_key("createdAt"));
}

#[test]
fn test_unregistered_mixin_is_schema_error() {
    let registries = [
        MixinRegistry::new(),
        MixinRegistry::new().with("Timestamp", |_model, _options| Ok(())),
    ];
    for mixins in registries {
        let descriptor = SchemaDescriptor::new("Note").mixin("SoftDelete", json!(true));
        let config = StandaloneConfig::builder()
            .connector(memory_profile("main"))
            .schemas(vec![descriptor])
            .mixins(mixins)
            .build()
            .unwrap();

        match assemble(&config) {
            Err(StandaloneError::SchemaError { model, .. }) => assert_eq!(model, "Note"),
            other => panic!("unexpected result: {:?}", other.map(|m| m.names())),
        }
    }
}

#[test]
fn test_reserved_mixin_needs_no_registry() {
    let descriptor = SchemaDescriptor::new("Note").mixin("RemoteRouting", json!({"disable": ["find"]}));
    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .schemas(vec![descriptor])
        .build()
        .unwrap();

    let models = assemble(&config).unwrap();
    assert!(models["Note"].mixins().is_empty());
}

#[test]
fn test_base_must_precede_subclass() {
    let base = SchemaDescriptor::new("Animal").property("name", PropertyDefinition::new(PropertyType::String));
    let child = SchemaDescriptor::new("Dog").base("Animal");

    let ordered = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .schemas(vec![base.clone(), child.clone()])
        .build()
        .unwrap();
    let models = assemble(&ordered).unwrap();
    assert!(models["Dog"].definition().properties.contains_key("name"));

    let reversed = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .schemas(vec![child, base])
        .build()
        .unwrap();
    assert!(matches!(assemble(&reversed), Err(StandaloneError::SchemaError { .. })));
}

#[test]
fn test_customization_runs_with_hook_stubs() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let customizations = CustomizationRegistry::new().with("UserProfile", move |model| {
        model.remote_method("summary", RemoteMethodSpec::default())?;
        model.before_remote("*", Arc::new(|_ctx: &mut RemoteContext| -> anyhow::Result<()> { Ok(()) }))?;
        model.after_remote("*", Arc::new(|_ctx: &mut RemoteContext| -> anyhow::Result<()> { Ok(()) }))?;
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .schemas(vec![SchemaDescriptor::new("UserProfile"), SchemaDescriptor::new("Note")])
        .customizations(customizations)
        .build()
        .unwrap();
    let models = assemble(&config).unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(models["UserProfile"].remote_host().is_some());
    assert!(models["Note"].remote_host().is_none());
}

#[test]
fn test_customization_error_propagates() {
    let customizations =
        CustomizationRegistry::new().with("Note", |_model| Err(anyhow::anyhow!("bad customization")));
    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .schemas(vec![SchemaDescriptor::new("Note")])
        .customizations(customizations)
        .build()
        .unwrap();

    match assemble(&config) {
        Err(StandaloneError::CustomizationError { model, message }) => {
            assert_eq!(model, "Note");
            assert!(message.contains("bad customization"));
        }
        other => panic!("unexpected result: {:?}", other.map(|m| m.names())),
    }
}

#[test]
fn test_unknown_driver_rejected() {
    let profile = ConnectorProfile::builder()
        .name("main")
        .connector("oracle")
        .build()
        .unwrap();
    let config = StandaloneConfig::builder()
        .connector(profile)
        .schemas(vec![SchemaDescriptor::new("Note")])
        .build()
        .unwrap();

    assert!(matches!(
        assemble(&config),
        Err(StandaloneError::UnsupportedConnector { .. })
    ));
}

#[test]
fn test_invocations_do_not_share_connections() {
    let config = StandaloneConfig::builder()
        .connector(memory_profile("main"))
        .schemas(vec![SchemaDescriptor::new("Note")])
        .build()
        .unwrap();

    let first = assemble(&config).unwrap();
    let second = assemble(&config).unwrap();
    let first_connection = first.connection().unwrap();
    let second_connection = second.connection().unwrap();
    assert!(!Arc::ptr_eq(&first_connection.connector(), &second_connection.connector()));
}
