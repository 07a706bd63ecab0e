//! # 连接器配置构建器模块

use crate::error::StandaloneResult;
use crate::i18n::t;
use crate::security::{validate_identifier, IdentifierKind};
use crate::types::ConnectorProfile;
use serde_json::{Map, Value};
use rat_logger::info;

/// 连接器配置构建器
///
/// 逻辑名与驱动标识必须显式设置
#[derive(Debug, Default)]
pub struct ConnectorProfileBuilder {
    name: Option<String>,
    connector: Option<String>,
    sync: bool,
    discovery: bool,
    settings: Map<String, Value>,
}

impl ConnectorProfileBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置逻辑名
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设置驱动标识
    pub fn connector<S: Into<String>>(mut self, connector: S) -> Self {
        self.connector = Some(connector.into());
        self
    }

    /// 设置驱动参数
    ///
    /// # 参数
    ///
    /// * `key` - 参数名，例如 `host`、`file`
    /// * `value` - 参数值
    pub fn setting<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn discovery(mut self, discovery: bool) -> Self {
        self.discovery = discovery;
        self
    }

    /// 构建连接器配置
    ///
    /// # 错误
    ///
    /// 逻辑名或驱动标识未设置、或逻辑名不是合法标识符时返回 `ConfigError`
    pub fn build(self) -> StandaloneResult<ConnectorProfile> {
        let name = self
            .name
            .ok_or_else(|| crate::quick_error!(config, t("error.profile_name_missing")))?;
        let connector = self
            .connector
            .ok_or_else(|| crate::quick_error!(config, t("error.profile_driver_missing")))?;

        validate_identifier(IdentifierKind::Model, &name)
            .map_err(|e| crate::quick_error!(config, format!("连接器逻辑名无效: {}", e)))?;

        let mut settings = self.settings;
        settings.remove("sync");
        settings.remove("discovery");

        info!("创建连接器配置: 名称={}, 驱动={}", name, connector);
        Ok(ConnectorProfile {
            name,
            connector,
            sync: self.sync,
            discovery: self.discovery,
            settings,
        })
    }
}
