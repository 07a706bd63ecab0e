//! 内存连接器
//!
//! 进程内的表存储，支持列、外键、索引与视图，适用于测试和临时进程。
//! 同一个 [`MemoryStore`] 可以被多个连接器共享，模拟同一个数据库被多次连接。

use crate::adapter::{Connector, SchemaDiff};
use crate::error::{StandaloneError, StandaloneResult};
use crate::model::ModelDefinition;
use crate::types::{
    compare_values, values_equal, DiscoveredColumn, DiscoveredTable, DiscoveryOptions, Filter,
    ForeignKeyDescriptor, PropertyType, Record, SortDirection, TableDescriptor, TableKind,
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use rat_logger::{debug, info};

/// 内存表
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    pub kind: TableKind,
    pub columns: Vec<DiscoveredColumn>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    /// 索引名 -> 列
    pub indexes: BTreeMap<String, Vec<String>>,
    pub rows: Vec<Record>,
    next_id: i64,
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self {
            kind: TableKind::Table,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: BTreeMap::new(),
            rows: Vec::new(),
            next_id: 0,
        }
    }
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 视图
    pub fn view() -> Self {
        Self {
            kind: TableKind::View,
            ..Self::default()
        }
    }

    /// 添加主键列
    pub fn primary_key(mut self, name: &str, data_type: PropertyType) -> Self {
        self.columns.push(DiscoveredColumn {
            name: name.to_string(),
            data_type,
            nullable: false,
            primary_key: true,
        });
        self
    }

    /// 添加可空列
    pub fn column(mut self, name: &str, data_type: PropertyType) -> Self {
        self.columns.push(DiscoveredColumn {
            name: name.to_string(),
            data_type,
            nullable: true,
            primary_key: false,
        });
        self
    }

    /// 添加外键约束
    pub fn foreign_key(mut self, column: &str, target_table: &str, target_column: &str) -> Self {
        self.foreign_keys.push(ForeignKeyDescriptor {
            column: column.to_string(),
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
        });
        self
    }

    fn from_model(model: &ModelDefinition) -> Self {
        let id_column = model.id_column().to_string();
        let columns = model
            .columns()
            .into_iter()
            .map(|(name, property)| DiscoveredColumn {
                name: name.to_string(),
                data_type: property.property_type.clone(),
                nullable: name != id_column && !property.required,
                primary_key: name == id_column,
            })
            .collect();
        let indexes = model
            .indexes
            .iter()
            .map(|index| (index.name.clone(), model.index_columns(index)))
            .collect();
        Self {
            columns,
            indexes,
            ..Self::default()
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    fn select(&self, filter: &Filter) -> Vec<Record> {
        let mut rows: Vec<Record> = self
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();

        if let Some(order) = &filter.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&order.field).unwrap_or(&Value::Null),
                    b.get(&order.field).unwrap_or(&Value::Null),
                );
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        rows.into_iter()
            .skip(filter.skip.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// 内存存储，克隆后共享同一份数据
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<DashMap<String, MemoryTable>>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tables", &self.table_names())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 定义（或替换）一张表
    pub fn define_table(&self, name: &str, table: MemoryTable) {
        self.tables.insert(name.to_string(), table);
    }

    /// 直接写入一行，不做任何校验
    pub fn insert_row(&self, table: &str, row: Record) {
        if let Some(mut entry) = self.tables.get_mut(table) {
            entry.rows.push(row);
        }
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.tables.get(name).map(|t| t.value().clone())
    }

    /// 全部表名（有序）
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }

    pub fn column_names(&self, table: &str) -> Option<Vec<String>> {
        self.tables.get(table).map(|t| t.column_names())
    }

    pub fn index_names(&self, table: &str) -> Vec<String> {
        self.tables
            .get(table)
            .map(|t| t.indexes.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn diff(&self, model: &ModelDefinition) -> SchemaDiff {
        let live_columns = self.column_names(&model.table);
        let live_indexes = self.index_names(&model.table);
        SchemaDiff::compute(model, live_columns.as_deref(), &live_indexes)
    }
}

/// 内存连接器
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn driver(&self) -> &str {
        "memory"
    }

    async fn create(&self, model: &ModelDefinition, row: Record) -> StandaloneResult<Record> {
        let mut entry = self
            .store
            .tables
            .entry(model.table.clone())
            .or_insert_with(|| MemoryTable::from_model(model));
        let table = entry.value_mut();

        if let Some(unknown) = row.keys().find(|k| !table.has_column(k)) {
            return Err(crate::quick_error!(
                query,
                format!("表 '{}' 中不存在列 '{}'", model.table, unknown)
            ));
        }

        let id_column = model.id_column().to_string();
        let mut row = row;
        let id = row.get(&id_column).cloned().unwrap_or(Value::Null);
        let id = if id.is_null() {
            if !model.id_generated {
                return Err(crate::quick_error!(validation, id_column, "主键不能为空"));
            }
            table.next_id += 1;
            Value::from(table.next_id)
        } else {
            if let Some(n) = id.as_i64() {
                table.next_id = table.next_id.max(n);
            }
            id
        };

        if table
            .rows
            .iter()
            .any(|r| values_equal(r.get(&id_column).unwrap_or(&Value::Null), &id))
        {
            return Err(crate::quick_error!(
                query,
                format!("表 '{}' 中主键 {} 已存在", model.table, id)
            ));
        }
        row.insert(id_column, id);

        let full: Record = table
            .columns
            .iter()
            .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
            .collect();
        table.rows.push(full.clone());
        debug!("内存表 {} 写入一行", model.table);
        Ok(full)
    }

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<Vec<Record>> {
        Ok(self
            .store
            .tables
            .get(&model.table)
            .map(|table| table.select(filter))
            .unwrap_or_default())
    }

    async fn count(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        Ok(self
            .store
            .tables
            .get(&model.table)
            .map(|table| table.rows.iter().filter(|row| filter.matches(row)).count() as u64)
            .unwrap_or(0))
    }

    async fn destroy(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        let Some(mut table) = self.store.tables.get_mut(&model.table) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|row| !filter.matches(row));
        Ok((before - table.rows.len()) as u64)
    }

    async fn is_actual(&self, models: &[ModelDefinition]) -> StandaloneResult<bool> {
        Ok(models.iter().all(|model| self.store.diff(model).is_empty()))
    }

    async fn autoupdate(&self, models: &[ModelDefinition]) -> StandaloneResult<()> {
        for model in models {
            let diff = self.store.diff(model);
            if diff.is_empty() {
                continue;
            }

            if diff.create_table {
                info!("内存存储创建表: {}", model.table);
                self.store.define_table(&model.table, MemoryTable::from_model(model));
                continue;
            }

            if let Some(mut table) = self.store.tables.get_mut(&model.table) {
                for column in &diff.missing_columns {
                    let data_type = model
                        .property_by_column(column)
                        .map(|p| p.property_type.clone())
                        .unwrap_or_default();
                    table.columns.push(DiscoveredColumn {
                        name: column.clone(),
                        data_type,
                        nullable: true,
                        primary_key: false,
                    });
                    for row in table.rows.iter_mut() {
                        row.insert(column.clone(), Value::Null);
                    }
                    info!("内存表 {} 新增列: {}", model.table, column);
                }
                for index in &diff.missing_indexes {
                    table
                        .indexes
                        .insert(index.name.clone(), model.index_columns(index));
                    info!("内存表 {} 新建索引: {}", model.table, index.name);
                }
            }
        }
        Ok(())
    }

    async fn discover_model_definitions(
        &self,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<Vec<TableDescriptor>> {
        let mut tables: Vec<TableDescriptor> = self
            .store
            .tables
            .iter()
            .filter(|t| options.views || t.kind == TableKind::Table)
            .map(|t| TableDescriptor {
                name: t.key().clone(),
                kind: t.kind,
                owner: None,
            })
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }

    async fn discover_table(
        &self,
        table: &str,
        _options: &DiscoveryOptions,
    ) -> StandaloneResult<DiscoveredTable> {
        let entry = self
            .store
            .tables
            .get(table)
            .ok_or_else(|| StandaloneError::DiscoveryError {
                table: table.to_string(),
                message: "表不存在".to_string(),
            })?;
        Ok(DiscoveredTable {
            name: table.to_string(),
            columns: entry.columns.clone(),
            foreign_keys: entry.foreign_keys.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBuilder;
    use crate::types::{PropertyDefinition, SchemaDescriptor};
    use serde_json::json;

    fn note() -> ModelDefinition {
        let descriptor = SchemaDescriptor::new("Note")
            .property("title", PropertyDefinition::new(PropertyType::String))
            .property("rank", PropertyDefinition::new(PropertyType::Number));
        let models = ModelBuilder::new().build_models(&[descriptor]).unwrap();
        models["Note"].definition()
    }

    fn row(title: &str, rank: i64) -> Record {
        let mut row = Record::new();
        row.insert("title".to_string(), json!(title));
        row.insert("rank".to_string(), json!(rank));
        row
    }

    #[tokio::test]
    async fn test_create_find_destroy() {
        let connector = MemoryConnector::new(MemoryStore::new());
        let model = note();

        let first = connector.create(&model, row("a", 2)).await.unwrap();
        let second = connector.create(&model, row("b", 1)).await.unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));

        let ordered = connector
            .find(&model, &Filter::new().order_by("rank", SortDirection::Asc))
            .await
            .unwrap();
        assert_eq!(ordered[0]["title"], json!("b"));

        let page = connector
            .find(&model, &Filter::new().order_by("rank", SortDirection::Asc).skip(1).limit(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["title"], json!("a"));

        assert_eq!(connector.count(&model, &Filter::new()).await.unwrap(), 2);
        assert_eq!(
            connector.destroy(&model, &Filter::new().eq("id", json!(1))).await.unwrap(),
            1
        );
        assert_eq!(connector.count(&model, &Filter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_and_unknown_column() {
        let connector = MemoryConnector::new(MemoryStore::new());
        let model = note();

        let mut explicit = row("a", 1);
        explicit.insert("id".to_string(), json!(7));
        connector.create(&model, explicit.clone()).await.unwrap();
        assert!(connector.create(&model, explicit).await.is_err());

        let next = connector.create(&model, row("b", 2)).await.unwrap();
        assert_eq!(next["id"], json!(8));

        let mut unknown = row("c", 3);
        unknown.insert("ghost".to_string(), json!(true));
        assert!(connector.create(&model, unknown).await.is_err());
    }

    #[tokio::test]
    async fn test_autoupdate_is_additive() {
        let store = MemoryStore::new();
        store.define_table(
            "Note",
            MemoryTable::new()
                .primary_key("id", PropertyType::Number)
                .column("legacy", PropertyType::String),
        );
        let connector = MemoryConnector::new(store.clone());
        let model = note();

        assert!(!connector.is_actual(&[model.clone()]).await.unwrap());
        connector.autoupdate(&[model.clone()]).await.unwrap();
        assert!(connector.is_actual(&[model]).await.unwrap());

        let columns = store.column_names("Note").unwrap();
        assert!(columns.contains(&"legacy".to_string()));
        assert!(columns.contains(&"title".to_string()));
        assert!(columns.contains(&"rank".to_string()));
    }

    #[tokio::test]
    async fn test_discovery_lists_tables_and_views() {
        let store = MemoryStore::new();
        store.define_table("config", MemoryTable::new().primary_key("id", PropertyType::Number));
        store.define_table("summary", MemoryTable::view().column("total", PropertyType::Number));
        let connector = MemoryConnector::new(store);

        let tables = connector
            .discover_model_definitions(&DiscoveryOptions::default())
            .await
            .unwrap();
        assert_eq!(tables.len(), 1);

        let with_views = DiscoveryOptions {
            views: true,
            ..DiscoveryOptions::default()
        };
        let tables = connector.discover_model_definitions(&with_views).await.unwrap();
        assert_eq!(tables.len(), 2);

        let missing = connector.discover_table("ghost", &with_views).await;
        assert!(matches!(missing, Err(StandaloneError::DiscoveryError { .. })));
    }
}
