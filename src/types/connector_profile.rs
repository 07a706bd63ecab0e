//! 连接器配置定义
//!
//! 连接器配置是一个扁平映射：逻辑名、驱动标识、主机端口凭据等驱动参数，
//! 以及只由本层消费、不会传给驱动的 `sync` / `discovery` 两个模式开关。

use crate::error::{StandaloneError, StandaloneResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use rat_logger::info;

/// 连接器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorProfile {
    /// 逻辑名
    pub name: String,
    /// 驱动标识，例如 `memory`、`sqlite`
    pub connector: String,
    /// 是否在组装后同步表结构
    #[serde(default)]
    pub sync: bool,
    /// 是否以逆向发现模式运行
    #[serde(default)]
    pub discovery: bool,
    /// 其余驱动参数（host、port、database、user、password、file 等）
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// 传给驱动的参数（已去掉模式开关）
pub type DriverSettings = Map<String, Value>;

impl ConnectorProfile {
    /// 创建配置构建器
    pub fn builder() -> crate::config::ConnectorProfileBuilder {
        crate::config::ConnectorProfileBuilder::new()
    }

    /// 从配置文件加载（`.toml` 或 `.json`）
    pub fn from_file<P: AsRef<Path>>(path: P) -> StandaloneResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(StandaloneError::IoError)?;

        let profile: ConnectorProfile =
            if path.as_ref().extension().and_then(|s| s.to_str()) == Some("toml") {
                toml::from_str(&content).map_err(|e| {
                    crate::quick_error!(config, format!("解析TOML连接配置失败: {}", e))
                })?
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    crate::quick_error!(config, format!("解析JSON连接配置失败: {}", e))
                })?
            };

        info!("从文件加载连接配置: {:?}", path.as_ref());
        Ok(profile)
    }

    /// 读取字符串参数
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }

    pub fn host(&self) -> Option<&str> {
        self.setting_str("host")
    }

    pub fn port(&self) -> Option<u16> {
        self.settings
            .get("port")
            .and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .and_then(|p| u16::try_from(p).ok())
    }

    pub fn database(&self) -> Option<&str> {
        self.setting_str("database")
    }

    pub fn file(&self) -> Option<&str> {
        self.setting_str("file")
    }

    /// 生成传给驱动的参数：逻辑名 + 驱动标识 + 全部驱动参数，不含模式开关
    pub fn driver_settings(&self) -> DriverSettings {
        let mut settings = self.settings.clone();
        settings.remove("sync");
        settings.remove("discovery");
        settings.insert("name".to_string(), Value::String(self.name.clone()));
        settings.insert("connector".to_string(), Value::String(self.connector.clone()));
        settings
    }
}
