//! 类型定义
//!
//! 模型描述、连接器配置以及查询/元数据类型

pub mod connector_profile;
pub mod query;
pub mod schema;

// 重新导出所有公共类型
pub use connector_profile::{ConnectorProfile, DriverSettings};
pub use query::{
    compare_values, values_equal, DiscoveredColumn, DiscoveredTable, DiscoveryOptions, Filter,
    ForeignKeyDescriptor, Record, SortConfig, SortDirection, TableDescriptor, TableKind,
};
pub use schema::{
    DefaultFn, ModelOptions, PropertyDefinition, PropertyType, RelationDefinition, RelationHint,
    RelationType, SchemaDescriptor, BUILTIN_BASES, RESERVED_TYPE_NAMES,
};
