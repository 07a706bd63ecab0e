//! 模型系统模块
//!
//! 模型定义、批量构建、模型句柄与关系访问

pub mod builder;
pub mod collection;
pub mod definition;
pub mod handle;
pub mod hooks;
pub mod relation;

pub use builder::{ModelBuilder, DEFAULT_ID_PROPERTY};
pub use collection::ModelCollection;
pub use definition::{IndexDefinition, ModelDefinition};
pub use handle::{ModelHandle, Observer, OperationHook, WeakModelHandle};
pub use hooks::{HookHostKind, RemoteContext, RemoteHookFn, RemoteHooks, RemoteMethodSpec, StandaloneHooks};
pub use relation::{default_through, model_key, RelatedRecords, RelationAccessor};
