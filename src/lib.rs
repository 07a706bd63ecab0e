//! rat_standalone - 脱离Web框架的独立数据访问层
//!
//! 根据JSON模型描述批量组装模型，绑定到单个连接并定义关系，
//! 可选地以增量方式同步表结构，或从现有数据库逆向发现模型

// 导出所有公共模块
pub mod error;
pub mod types;
pub mod i18n;
pub mod security;
pub mod config;
pub mod adapter;
pub mod connection;
pub mod model;
pub mod loader;
pub mod mixin;
pub mod customize;
pub mod sync;
pub mod discovery;
pub mod standalone;

// 重新导出常用类型和函数
pub use error::{StandaloneError, StandaloneResult};
pub use types::*;
pub use config::{
    memory_profile, sqlite_profile, ConnectorProfileBuilder, RunMode, StandaloneConfig,
    StandaloneConfigBuilder,
};
pub use adapter::{
    create_connector, Connector, ConnectorFactory, ConnectorRegistry, MemoryConnector, MemoryStore,
    MemoryTable,
};
#[cfg(feature = "sqlite-support")]
pub use adapter::SqliteConnector;
pub use connection::{ConnectionHandle, ErrorListener, ErrorSink};
pub use model::{
    ModelBuilder, ModelCollection, ModelDefinition, ModelHandle, RelatedRecords, RelationAccessor,
    RemoteHooks, RemoteMethodSpec, StandaloneHooks,
};
pub use loader::load_schemas;
pub use mixin::{MixinFn, MixinRegistry};
pub use customize::{model_slug, CustomizationFn, CustomizationRegistry};
pub use sync::{sync_models, SyncOutcome, SyncStatus};
pub use discovery::{discover_models, merge_hints};
pub use standalone::{assemble, discover, run, sync, PendingDiscovery, PendingSync, Standalone};

// 条件编译调试宏 - 只有在 debug 模式下才输出调试信息
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        rat_logger::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        // 在 release 模式下不输出调试信息
    };
}

/// 初始化rat_standalone库
///
/// 注册多语言错误消息并按环境变量选择语言
///
/// 注意：日志系统由调用者自行初始化，本库不会自动初始化日志
pub fn init() {
    i18n::ErrorMessageI18n::init();
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
