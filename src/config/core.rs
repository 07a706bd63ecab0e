//! # 配置管理模块 - 核心配置类型
//!
//! 独立运行配置：连接器配置、模型来源、混入、自定义逻辑以及运行模式

use crate::adapter::ConnectorRegistry;
use crate::connection::ErrorSink;
use crate::customize::CustomizationRegistry;
use crate::error::StandaloneResult;
use crate::i18n::t;
use crate::mixin::MixinRegistry;
use crate::types::{ConnectorProfile, DiscoveryOptions, RelationHint, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// 同步组装，直接返回模型集合
    Assemble,
    /// 组装后同步表结构
    Sync,
    /// 逆向发现
    Discovery,
}

/// 独立运行配置
///
/// 通过 `StandaloneConfig::builder()` 创建
#[derive(Clone)]
pub struct StandaloneConfig {
    /// 连接器配置
    pub connector: ConnectorProfile,
    /// 预先排好序的模型描述，设置后不再读取模型目录
    pub schemas: Option<Vec<SchemaDescriptor>>,
    /// 模型目录，同时也是自定义逻辑的根目录
    pub models_path: Option<PathBuf>,
    /// 关系覆盖提示（仅逆向发现模式使用）
    pub relations: Vec<RelationHint>,
    /// 混入表
    pub mixins: MixinRegistry,
    /// 自定义逻辑表
    pub customizations: CustomizationRegistry,
    /// 是否同步表结构
    pub sync: bool,
    /// 是否逆向发现
    pub discovery: bool,
    /// 驱动注册表
    pub drivers: ConnectorRegistry,
    /// 连接层错误的去向
    pub error_sink: ErrorSink,
    /// 逆向发现选项
    pub discovery_options: DiscoveryOptions,
}

impl fmt::Debug for StandaloneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandaloneConfig")
            .field("connector", &self.connector)
            .field("schemas", &self.schemas.as_ref().map(|s| s.len()))
            .field("models_path", &self.models_path)
            .field("relations", &self.relations)
            .field("mixins", &self.mixins)
            .field("customizations", &self.customizations)
            .field("sync", &self.sync)
            .field("discovery", &self.discovery)
            .field("drivers", &self.drivers)
            .field("error_sink", &self.error_sink)
            .field("discovery_options", &self.discovery_options)
            .finish()
    }
}

impl StandaloneConfig {
    /// 创建配置构建器
    pub fn builder() -> crate::config::StandaloneConfigBuilder {
        crate::config::StandaloneConfigBuilder::new()
    }

    /// 解析运行模式
    ///
    /// `sync` 与 `discovery` 同时启用时返回 `ConfigError`，不做任何优先级取舍。
    pub fn mode(&self) -> StandaloneResult<RunMode> {
        match (self.sync, self.discovery) {
            (true, true) => Err(crate::quick_error!(config, t("error.mode_conflict"))),
            (true, false) => Ok(RunMode::Sync),
            (false, true) => Ok(RunMode::Discovery),
            (false, false) => Ok(RunMode::Assemble),
        }
    }
}
