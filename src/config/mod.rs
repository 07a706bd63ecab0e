//! # 配置管理模块
//!
//! 提供独立运行所需的配置类型与构建器，支持链式配置
//! 严格遵循项目规范：必需的配置项必须显式设置

pub mod builders;
pub mod convenience;
pub mod core;

pub use builders::{ConnectorProfileBuilder, StandaloneConfigBuilder};
pub use convenience::{memory_profile, sqlite_profile};
pub use core::{RunMode, StandaloneConfig};
