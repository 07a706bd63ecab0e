//! 逆向发现的集成测试

use async_trait::async_trait;
use rat_standalone::*;
use serde_json::json;
use std::sync::Arc;

fn seeded_store(with_foreign_key: bool) -> MemoryStore {
    let store = MemoryStore::new();
    store.define_table(
        "config",
        MemoryTable::new()
            .primary_key("id", PropertyType::Number)
            .column("label", PropertyType::String),
    );
    let mut state = MemoryTable::new()
        .primary_key("id", PropertyType::Number)
        .column("config_id", PropertyType::Number);
    if with_foreign_key {
        state = state.foreign_key("config_id", "config", "id");
    }
    store.define_table("state", state);
    store.define_table("active_state", MemoryTable::view().column("id", PropertyType::Number));

    let mut config_row = Record::new();
    config_row.insert("id".to_string(), json!(1));
    config_row.insert("label".to_string(), json!("primary"));
    store.insert_row("config", config_row);
    let mut state_row = Record::new();
    state_row.insert("id".to_string(), json!(10));
    state_row.insert("config_id".to_string(), json!(1));
    store.insert_row("state", state_row);
    store
}

fn discovery_config(connector: Arc<dyn Connector>, hints: Vec<RelationHint>) -> StandaloneConfig {
    let profile = ConnectorProfile::builder()
        .name("legacy")
        .connector("fixture")
        .discovery(true)
        .build()
        .unwrap();
    let factory: ConnectorFactory =
        Arc::new(move |_settings: &DriverSettings| -> StandaloneResult<Arc<dyn Connector>> {
            Ok(connector.clone())
        });
    StandaloneConfig::builder()
        .connector(profile)
        .driver("fixture", factory)
        .relations(hints)
        .build()
        .unwrap()
}

fn memory(store: &MemoryStore) -> Arc<dyn Connector> {
    Arc::new(MemoryConnector::new(store.clone()))
}

#[tokio::test]
async fn test_belongs_to_inferred_from_foreign_key() {
    let store = seeded_store(true);
    let Standalone::Discovery(pending) = run(discovery_config(memory(&store), Vec::new())).unwrap() else {
        panic!("expected discovery mode");
    };
    let models = pending.await.unwrap();

    assert_eq!(models.names(), vec!["Config".to_string(), "State".to_string()]);
    let relation = models["State"].relation_definition("config").expect("inferred relation");
    assert_eq!(relation.relation_type, RelationType::BelongsTo);
    assert_eq!(relation.model, "Config");
    assert_eq!(relation.foreign_key.as_deref(), Some("configId"));

    let state = models["State"].find_by_id(&json!(10)).await.unwrap().unwrap();
    assert_eq!(state.get("configId"), Some(&json!(1)));
    let config = models["State"].related(&state, "config").await.unwrap().one().unwrap();
    assert_eq!(config.get("label"), Some(&json!("primary")));
}

#[tokio::test]
async fn test_no_relation_without_foreign_key() {
    let store = seeded_store(false);
    let models = discover(discovery_config(memory(&store), Vec::new())).await.unwrap();

    assert!(models.contains("State"));
    assert!(models["State"].relations().is_empty());
}

#[tokio::test]
async fn test_hints_override_and_extend() {
    let store = seeded_store(false);
    let hints = vec![
        RelationHint::new("State")
            .relation("settings", RelationDefinition::belongs_to("Config").foreign_key("configId")),
        RelationHint::new("Config").relation("states", RelationDefinition::has_many("State").foreign_key("configId")),
        RelationHint::new("Unknown").relation("x", RelationDefinition::belongs_to("Config")),
    ];
    let models = discover(discovery_config(memory(&store), hints)).await.unwrap();

    assert!(!models.contains("Unknown"));
    let config = models["Config"].find_by_id(&json!(1)).await.unwrap().unwrap();
    let states = models["Config"].related(&config, "states").await.unwrap().many();
    assert_eq!(states.len(), 1);
    assert!(models["State"].relation("settings").is_some());
}

#[tokio::test]
async fn test_hint_order_does_not_matter() {
    let first = RelationHint::new("State")
        .relation("settings", RelationDefinition::belongs_to("Config").foreign_key("configId"));
    let second = RelationHint::new("State").relation("peer", RelationDefinition::has_one("State"));

    let store = seeded_store(true);
    let forward = discover(discovery_config(memory(&store), vec![first.clone(), second.clone()]))
        .await
        .unwrap();
    let backward = discover(discovery_config(memory(&store), vec![second, first]))
        .await
        .unwrap();

    assert_eq!(forward["State"].relations(), backward["State"].relations());
    assert_eq!(forward["State"].relations().len(), 3);
}

/// a(b_id -> b)、b(c_id -> c)、c 三张表组成的外键链
fn chain_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.define_table(
        "a",
        MemoryTable::new()
            .primary_key("id", PropertyType::Number)
            .column("b_id", PropertyType::Number)
            .foreign_key("b_id", "b", "id"),
    );
    store.define_table(
        "b",
        MemoryTable::new()
            .primary_key("id", PropertyType::Number)
            .column("c_id", PropertyType::Number)
            .foreign_key("c_id", "c", "id"),
    );
    store.define_table(
        "c",
        MemoryTable::new()
            .primary_key("id", PropertyType::Number)
            .column("label", PropertyType::String),
    );

    let mut c_row = Record::new();
    c_row.insert("id".to_string(), json!(3));
    c_row.insert("label".to_string(), json!("leaf"));
    store.insert_row("c", c_row);
    let mut b_row = Record::new();
    b_row.insert("id".to_string(), json!(2));
    b_row.insert("c_id".to_string(), json!(3));
    store.insert_row("b", b_row);
    let mut a_row = Record::new();
    a_row.insert("id".to_string(), json!(1));
    a_row.insert("b_id".to_string(), json!(2));
    store.insert_row("a", a_row);
    store
}

#[tokio::test]
async fn test_foreign_key_chain_discovered() {
    let store = chain_store();
    let models = discover(discovery_config(memory(&store), Vec::new())).await.unwrap();

    assert_eq!(models.names(), vec!["A".to_string(), "B".to_string(), "C".to_string()]);
    assert!(models["A"].relation_definition("b").is_some());
    // B 既是 A 的外键目标又有自己的外键，合并后保留自己批次中带关系的句柄
    let relation = models["B"].relation_definition("c").expect("relation c on B");
    assert_eq!(relation.model, "C");
    assert_eq!(relation.foreign_key.as_deref(), Some("cId"));
    assert!(models["C"].relations().is_empty());

    let a = models["A"].find_by_id(&json!(1)).await.unwrap().unwrap();
    let b = models["A"].related(&a, "b").await.unwrap().one().unwrap();
    let c = models["B"].related(&b, "c").await.unwrap().one().unwrap();
    assert_eq!(c.get("label"), Some(&json!("leaf")));
}

/// 对指定表的结构读取总是失败的连接器
struct FailingConnector {
    inner: MemoryConnector,
    broken: String,
}

#[async_trait]
impl Connector for FailingConnector {
    fn driver(&self) -> &str {
        "failing"
    }

    async fn create(&self, model: &ModelDefinition, row: Record) -> StandaloneResult<Record> {
        self.inner.create(model, row).await
    }

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<Vec<Record>> {
        self.inner.find(model, filter).await
    }

    async fn count(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        self.inner.count(model, filter).await
    }

    async fn destroy(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        self.inner.destroy(model, filter).await
    }

    async fn is_actual(&self, models: &[ModelDefinition]) -> StandaloneResult<bool> {
        self.inner.is_actual(models).await
    }

    async fn autoupdate(&self, models: &[ModelDefinition]) -> StandaloneResult<()> {
        self.inner.autoupdate(models).await
    }

    async fn discover_model_definitions(
        &self,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<Vec<TableDescriptor>> {
        self.inner.discover_model_definitions(options).await
    }

    async fn discover_table(
        &self,
        table: &str,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<DiscoveredTable> {
        if table == self.broken {
            return Err(StandaloneError::QueryError {
                message: format!("permission denied for {}", table),
            });
        }
        self.inner.discover_table(table, options).await
    }
}

#[tokio::test]
async fn test_single_table_failure_rejects_whole_discovery() {
    let store = seeded_store(false);
    store.define_table("zeta", MemoryTable::new().primary_key("id", PropertyType::Number));
    let connector: Arc<dyn Connector> = Arc::new(FailingConnector {
        inner: MemoryConnector::new(store),
        broken: "state".to_string(),
    });

    match discover(discovery_config(connector, Vec::new())).await {
        Err(StandaloneError::DiscoveryError { table, message }) => {
            assert_eq!(table, "state");
            assert!(message.contains("permission denied"));
        }
        other => panic!("unexpected result: {:?}", other.map(|m| m.names())),
    }
}

#[tokio::test]
async fn test_conflicting_hints_rejected() {
    let store = seeded_store(false);
    let hints = vec![
        RelationHint::new("State").relation("config", RelationDefinition::belongs_to("Config")),
        RelationHint::new("State").relation("config", RelationDefinition::has_one("Config")),
    ];

    let result = discover(discovery_config(memory(&store), hints)).await;
    assert!(matches!(result, Err(StandaloneError::ConfigError { .. })));
}
