//! # 便利配置函数模块
//!
//! 提供常用连接器配置的便利函数，简化配置过程

use crate::types::ConnectorProfile;
use serde_json::{Map, Value};

/// 创建内存连接器配置
///
/// # 参数
///
/// * `name` - 连接逻辑名
pub fn memory_profile(name: &str) -> ConnectorProfile {
    ConnectorProfile {
        name: name.to_string(),
        connector: "memory".to_string(),
        sync: false,
        discovery: false,
        settings: Map::new(),
    }
}

/// 创建SQLite连接器配置
///
/// # 参数
///
/// * `name` - 连接逻辑名
/// * `file` - 数据库文件路径，`:memory:` 表示内存库
pub fn sqlite_profile(name: &str, file: &str) -> ConnectorProfile {
    let mut settings = Map::new();
    settings.insert("file".to_string(), Value::String(file.to_string()));
    ConnectorProfile {
        name: name.to_string(),
        connector: "sqlite".to_string(),
        sync: false,
        discovery: false,
        settings,
    }
}
