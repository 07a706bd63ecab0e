//! 连接句柄
//!
//! 每次调用创建一个连接句柄。句柄在创建时先安装错误监听器，然后才绑定模型，
//! 连接层的瞬时错误因此只会被投递给监听器，而不会让进程崩溃。
//! 连接只以弱引用持有模型，模型以强引用持有连接。

use crate::adapter::{create_connector, Connector, ConnectorRegistry};
use crate::discovery::schema::{infer_relations, table_to_descriptor};
use crate::error::{StandaloneError, StandaloneResult};
use crate::model::{ModelBuilder, ModelCollection, ModelDefinition, ModelHandle, WeakModelHandle};
use crate::types::{ConnectorProfile, DiscoveredTable, DiscoveryOptions, Filter, Record, TableDescriptor};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use rat_logger::{debug, info, warn};

/// 错误监听器
pub type ErrorListener = Arc<dyn Fn(&StandaloneError) + Send + Sync>;

/// 连接层错误的去向
#[derive(Clone, Default)]
pub enum ErrorSink {
    /// 以 warn 级别记录
    #[default]
    Log,
    /// 完全静默
    Silent,
    /// 交给调用者
    Custom(ErrorListener),
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSink::Log => f.write_str("ErrorSink::Log"),
            ErrorSink::Silent => f.write_str("ErrorSink::Silent"),
            ErrorSink::Custom(_) => f.write_str("ErrorSink::Custom"),
        }
    }
}

impl ErrorSink {
    pub fn custom<F>(listener: F) -> Self
    where
        F: Fn(&StandaloneError) + Send + Sync + 'static,
    {
        ErrorSink::Custom(Arc::new(listener))
    }

    fn into_listener(self, connection: String) -> ErrorListener {
        match self {
            ErrorSink::Log => Arc::new(move |error: &StandaloneError| {
                warn!("连接 {} 出现连接层错误（已忽略）: {}", connection, error);
            }),
            ErrorSink::Silent => Arc::new(|_error: &StandaloneError| {}),
            ErrorSink::Custom(listener) => listener,
        }
    }
}

struct ConnectionInner {
    name: String,
    connector: Arc<dyn Connector>,
    models: DashMap<String, WeakModelHandle>,
    listeners: RwLock<Vec<ErrorListener>>,
}

/// 连接句柄
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("name", &self.inner.name)
            .field("driver", &self.inner.connector.driver())
            .field("models", &self.model_names())
            .finish()
    }
}

impl ConnectionHandle {
    /// 按连接器配置打开连接
    ///
    /// 驱动配置中已去掉 `sync`/`discovery` 标志。错误监听器在返回前安装。
    pub fn open(
        profile: &ConnectorProfile,
        drivers: &ConnectorRegistry,
        sink: ErrorSink,
    ) -> StandaloneResult<Self> {
        let connector = create_connector(profile, drivers)?;
        let handle = Self::with_connector(&profile.name, connector, sink);
        info!("打开连接: {} (驱动: {})", profile.name, profile.connector);
        Ok(handle)
    }

    /// 使用现成的连接器创建连接句柄
    pub fn with_connector(name: &str, connector: Arc<dyn Connector>, sink: ErrorSink) -> Self {
        let handle = Self {
            inner: Arc::new(ConnectionInner {
                name: name.to_string(),
                connector,
                models: DashMap::new(),
                listeners: RwLock::new(Vec::new()),
            }),
        };
        handle.on_error(sink.into_listener(name.to_string()));
        handle
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn driver(&self) -> &str {
        self.inner.connector.driver()
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        self.inner.connector.clone()
    }

    /// 追加错误监听器
    pub fn on_error(&self, listener: ErrorListener) {
        self.inner.listeners.write().push(listener);
    }

    /// 已安装的监听器数量
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// 将错误投递给全部监听器
    pub fn emit_error(&self, error: &StandaloneError) {
        let listeners: Vec<ErrorListener> = self.inner.listeners.read().clone();
        for listener in listeners {
            listener(error);
        }
    }

    /// 绑定模型
    pub fn attach(&self, model: &ModelHandle) {
        model.set_connection(self.clone());
        self.inner
            .models
            .insert(model.name().to_string(), model.downgrade());
        debug!("模型 {} 绑定到连接 {}", model.name(), self.inner.name);
    }

    /// 绑定集合中的全部模型
    pub fn attach_all(&self, models: &ModelCollection) {
        for (_, model) in models {
            self.attach(model);
        }
    }

    /// 按名称取已绑定且仍存活的模型
    pub fn model(&self, name: &str) -> Option<ModelHandle> {
        self.inner.models.get(name).and_then(|weak| weak.upgrade())
    }

    /// 已绑定且仍存活的模型名（有序）
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .models
            .iter()
            .filter(|entry| entry.value().upgrade().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    fn guard<T>(&self, result: StandaloneResult<T>) -> StandaloneResult<T> {
        if let Err(error) = &result {
            if error.is_connectivity() {
                self.emit_error(error);
            }
        }
        result
    }

    pub async fn create(&self, model: &ModelDefinition, row: Record) -> StandaloneResult<Record> {
        let result = self.inner.connector.create(model, row).await;
        self.guard(result)
    }

    pub async fn find(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<Vec<Record>> {
        let result = self.inner.connector.find(model, filter).await;
        self.guard(result)
    }

    pub async fn count(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        let result = self.inner.connector.count(model, filter).await;
        self.guard(result)
    }

    pub async fn destroy(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        let result = self.inner.connector.destroy(model, filter).await;
        self.guard(result)
    }

    pub async fn is_actual(&self, models: &[ModelDefinition]) -> StandaloneResult<bool> {
        let result = self.inner.connector.is_actual(models).await;
        self.guard(result)
    }

    pub async fn autoupdate(&self, models: &[ModelDefinition]) -> StandaloneResult<()> {
        let result = self.inner.connector.autoupdate(models).await;
        self.guard(result)
    }

    pub async fn discover_model_definitions(
        &self,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<Vec<TableDescriptor>> {
        let result = self.inner.connector.discover_model_definitions(options).await;
        self.guard(result)
    }

    pub async fn discover_table(
        &self,
        table: &str,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<DiscoveredTable> {
        let result = self.inner.connector.discover_table(table, options).await;
        self.guard(result)
    }

    /// 发现一张表并构建模型
    ///
    /// 开启 `relations` 时，被外键引用的表会一并发现（一层），并根据本表的
    /// 显式外键推断 `belongsTo` 关系。返回的模型已绑定到本连接。任何失败都
    /// 包装为 `DiscoveryError`。
    pub async fn discover_and_build_models(
        &self,
        table: &str,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<ModelCollection> {
        self.discover_and_build(table, options)
            .await
            .map_err(|error| match error {
                StandaloneError::DiscoveryError { .. } => error,
                other => StandaloneError::DiscoveryError {
                    table: table.to_string(),
                    message: other.to_string(),
                },
            })
    }

    async fn discover_and_build(
        &self,
        table: &str,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<ModelCollection> {
        let primary = self.discover_table(table, options).await?;
        let mut tables = vec![primary.clone()];

        if options.relations {
            for foreign_key in &primary.foreign_keys {
                if tables.iter().any(|t| t.name == foreign_key.target_table) {
                    continue;
                }
                tables.push(self.discover_table(&foreign_key.target_table, options).await?);
            }
        }

        let descriptors: Vec<_> = tables.iter().map(table_to_descriptor).collect();
        let models = ModelBuilder::new().build_models(&descriptors)?;
        self.attach_all(&models);

        // 只为本表推断关系，被引用的表由它们自己的批次负责
        if options.relations {
            let (name, relations) = infer_relations(&primary, &tables);
            if let Some(model) = models.get(&name).filter(|_| !relations.is_empty()) {
                ModelBuilder::new().define_relations(model, &relations)?;
            }
        }

        debug!("表 {} 发现完成，构建 {} 个模型", table, models.len());
        Ok(models)
    }

    /// 断开连接
    pub async fn disconnect(&self) -> StandaloneResult<()> {
        let result = self.inner.connector.disconnect().await;
        self.guard(result)
    }
}
