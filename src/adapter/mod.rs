//! 连接器模块
//!
//! 提供统一的数据库操作接口，屏蔽不同存储的实现差异。
//! 连接器只接触表名与列名，属性与列之间的映射由模型定义完成。

use crate::error::StandaloneResult;
use crate::model::ModelDefinition;
use crate::types::{
    DiscoveredTable, DiscoveryOptions, DriverSettings, Filter, Record, TableDescriptor,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use rat_logger::debug;

mod diff;
mod memory;
#[cfg(feature = "sqlite-support")]
mod sqlite;

pub use diff::SchemaDiff;
pub use memory::{MemoryConnector, MemoryStore, MemoryTable};
#[cfg(feature = "sqlite-support")]
pub use sqlite::SqliteConnector;

/// 连接器trait，定义统一的数据库操作接口
#[async_trait]
pub trait Connector: Send + Sync {
    /// 驱动标识
    fn driver(&self) -> &str;

    /// 创建记录，返回写入后的完整行
    async fn create(&self, model: &ModelDefinition, row: Record) -> StandaloneResult<Record>;

    /// 查找记录
    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<Vec<Record>>;

    /// 统计记录数量
    async fn count(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64>;

    /// 删除满足条件的记录，返回删除数量
    async fn destroy(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64>;

    /// 当前存储结构是否已与模型一致
    async fn is_actual(&self, models: &[ModelDefinition]) -> StandaloneResult<bool>;

    /// 增量更新存储结构：只建表、加列、建索引，从不删除
    async fn autoupdate(&self, models: &[ModelDefinition]) -> StandaloneResult<()>;

    /// 列出表级描述
    async fn discover_model_definitions(
        &self,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<Vec<TableDescriptor>>;

    /// 读取单张表的结构
    async fn discover_table(
        &self,
        table: &str,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<DiscoveredTable>;

    /// 断开连接
    async fn disconnect(&self) -> StandaloneResult<()> {
        Ok(())
    }
}

/// 连接器工厂，参数为剥离了编排标志的驱动配置
pub type ConnectorFactory =
    Arc<dyn Fn(&DriverSettings) -> StandaloneResult<Arc<dyn Connector>> + Send + Sync>;

/// 驱动注册表（驱动标识 -> 工厂）
#[derive(Clone)]
pub struct ConnectorRegistry {
    factories: BTreeMap<String, ConnectorFactory>,
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("drivers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("memory", Arc::new(|_settings: &DriverSettings| {
            Ok(Arc::new(MemoryConnector::new(MemoryStore::new())) as Arc<dyn Connector>)
        }));
        #[cfg(feature = "sqlite-support")]
        registry.register("sqlite", Arc::new(|settings: &DriverSettings| {
            Ok(Arc::new(SqliteConnector::open(settings)?) as Arc<dyn Connector>)
        }));
        registry
    }
}

impl ConnectorRegistry {
    /// 内置驱动：`memory`，以及启用 `sqlite-support` 时的 `sqlite`
    pub fn new() -> Self {
        Self::default()
    }

    /// 不含任何驱动的注册表
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, driver: &str, factory: ConnectorFactory) {
        self.factories.insert(driver.to_string(), factory);
    }

    /// 注册驱动（链式）
    pub fn with<F>(mut self, driver: &str, factory: F) -> Self
    where
        F: Fn(&DriverSettings) -> StandaloneResult<Arc<dyn Connector>> + Send + Sync + 'static,
    {
        self.register(driver, Arc::new(factory));
        self
    }

    pub fn contains(&self, driver: &str) -> bool {
        self.factories.contains_key(driver)
    }

    pub fn drivers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// 根据驱动标识创建连接器
    pub fn create(&self, driver: &str, settings: &DriverSettings) -> StandaloneResult<Arc<dyn Connector>> {
        let factory = self
            .factories
            .get(driver)
            .ok_or_else(|| crate::quick_error!(unsupported_connector, driver))?;
        debug!("创建连接器: {}", driver);
        factory(settings)
    }
}

/// 根据连接器配置创建连接器
pub fn create_connector(
    profile: &crate::types::ConnectorProfile,
    registry: &ConnectorRegistry,
) -> StandaloneResult<Arc<dyn Connector>> {
    registry.create(&profile.connector, &profile.driver_settings())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StandaloneError;
    use crate::types::ConnectorProfile;

    #[test]
    fn test_registry_resolves_builtin_and_rejects_unknown() {
        let registry = ConnectorRegistry::new();
        assert!(registry.contains("memory"));
        #[cfg(feature = "sqlite-support")]
        assert!(registry.contains("sqlite"));

        let connector = registry.create("memory", &DriverSettings::new()).unwrap();
        assert_eq!(connector.driver(), "memory");

        let result = registry.create("oracle", &DriverSettings::new());
        assert!(matches!(result, Err(StandaloneError::UnsupportedConnector { .. })));
    }

    #[test]
    fn test_custom_driver() {
        let store = MemoryStore::new();
        let registry = ConnectorRegistry::empty().with("shared", move |_settings: &DriverSettings| {
            Ok(Arc::new(MemoryConnector::new(store.clone())) as Arc<dyn Connector>)
        });
        let profile = ConnectorProfile::builder()
            .name("db")
            .connector("shared")
            .build()
            .unwrap();
        assert!(create_connector(&profile, &registry).is_ok());
    }
}
