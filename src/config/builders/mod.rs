//! # 配置构建器模块
//!
//! 提供所有配置类型的构建器实现，支持链式调用和严格验证

pub mod profile_builder;
pub mod standalone_builder;

pub use profile_builder::ConnectorProfileBuilder;
pub use standalone_builder::StandaloneConfigBuilder;
