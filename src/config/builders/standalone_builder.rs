//! # 独立运行配置构建器模块
//!
//! 提供独立运行配置的构建器实现，支持链式调用和严格验证

use crate::adapter::{ConnectorFactory, ConnectorRegistry};
use crate::config::core::StandaloneConfig;
use crate::connection::ErrorSink;
use crate::customize::CustomizationRegistry;
use crate::error::StandaloneResult;
use crate::i18n::t;
use crate::mixin::MixinRegistry;
use crate::types::{ConnectorProfile, DiscoveryOptions, RelationHint, SchemaDescriptor};
use std::path::PathBuf;
use rat_logger::info;

/// 独立运行配置构建器
///
/// 连接器配置必须显式设置；未提供 `schemas` 时必须设置 `models_path`
#[derive(Debug, Default)]
pub struct StandaloneConfigBuilder {
    connector: Option<ConnectorProfile>,
    schemas: Option<Vec<SchemaDescriptor>>,
    models_path: Option<PathBuf>,
    relations: Vec<RelationHint>,
    mixins: MixinRegistry,
    customizations: CustomizationRegistry,
    sync: Option<bool>,
    discovery: Option<bool>,
    drivers: Option<ConnectorRegistry>,
    error_sink: ErrorSink,
    discovery_options: DiscoveryOptions,
}

impl StandaloneConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置连接器配置
    pub fn connector(mut self, connector: ConnectorProfile) -> Self {
        self.connector = Some(connector);
        self
    }

    /// 直接提供模型描述（需已按基类优先排序）
    pub fn schemas(mut self, schemas: Vec<SchemaDescriptor>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// 设置模型目录
    pub fn models_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.models_path = Some(path.into());
        self
    }

    /// 追加一个关系覆盖提示
    pub fn relation(mut self, hint: RelationHint) -> Self {
        self.relations.push(hint);
        self
    }

    pub fn relations(mut self, hints: Vec<RelationHint>) -> Self {
        self.relations = hints;
        self
    }

    pub fn mixins(mut self, mixins: MixinRegistry) -> Self {
        self.mixins = mixins;
        self
    }

    pub fn customizations(mut self, customizations: CustomizationRegistry) -> Self {
        self.customizations = customizations;
        self
    }

    /// 启用或关闭表结构同步，未设置时取连接器配置中的 `sync`
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = Some(sync);
        self
    }

    /// 启用或关闭逆向发现，未设置时取连接器配置中的 `discovery`
    pub fn discovery(mut self, discovery: bool) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// 替换驱动注册表
    pub fn drivers(mut self, drivers: ConnectorRegistry) -> Self {
        self.drivers = Some(drivers);
        self
    }

    /// 在默认驱动注册表上追加一个驱动
    pub fn driver(mut self, driver: &str, factory: ConnectorFactory) -> Self {
        self.drivers
            .get_or_insert_with(ConnectorRegistry::new)
            .register(driver, factory);
        self
    }

    pub fn error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = sink;
        self
    }

    pub fn discovery_options(mut self, options: DiscoveryOptions) -> Self {
        self.discovery_options = options;
        self
    }

    /// 构建独立运行配置
    ///
    /// # 错误
    ///
    /// 连接器配置未设置、模型来源缺失或 `sync` 与 `discovery` 同时启用时返回 `ConfigError`
    pub fn build(self) -> StandaloneResult<StandaloneConfig> {
        let connector = self
            .connector
            .ok_or_else(|| crate::quick_error!(config, t("error.connector_missing")))?;

        let sync = self.sync.unwrap_or(connector.sync);
        let discovery = self.discovery.unwrap_or(connector.discovery);

        // 逆向发现不读取模型目录
        if !discovery && self.schemas.is_none() && self.models_path.is_none() {
            return Err(crate::quick_error!(config, t("error.models_path_missing")));
        }

        let config = StandaloneConfig {
            connector,
            schemas: self.schemas,
            models_path: self.models_path,
            relations: self.relations,
            mixins: self.mixins,
            customizations: self.customizations,
            sync,
            discovery,
            drivers: self.drivers.unwrap_or_default(),
            error_sink: self.error_sink,
            discovery_options: self.discovery_options,
        };
        let mode = config.mode()?;

        info!("创建独立运行配置: 连接器={}, 模式={:?}", config.connector.name, mode);
        Ok(config)
    }
}
