//! 发现结果到模型描述的转换
//!
//! 命名约定：表 `config_entry` -> 模型 `ConfigEntry`，列 `config_id` -> 属性 `configId`。
//! 名称不一致时保留 `options.table` / 属性 `column`，读写仍落在原表原列上。

use crate::types::{DiscoveredTable, PropertyDefinition, RelationDefinition, SchemaDescriptor};
use heck::{ToLowerCamelCase, ToUpperCamelCase};
use std::collections::BTreeMap;
use rat_logger::debug;

/// 表名 -> 模型名
pub fn model_name_for_table(table: &str) -> String {
    table.to_upper_camel_case()
}

/// 列名 -> 属性名
pub fn property_name_for_column(column: &str) -> String {
    column.to_lower_camel_case()
}

/// 将发现到的表转换为模型描述
pub fn table_to_descriptor(table: &DiscoveredTable) -> SchemaDescriptor {
    let name = model_name_for_table(&table.name);
    let mut descriptor = SchemaDescriptor::new(&name);
    if name != table.name {
        descriptor = descriptor.table(&table.name);
    }

    for column in &table.columns {
        let property = property_name_for_column(&column.name);
        let mut definition = PropertyDefinition::new(column.data_type.clone());
        if column.primary_key {
            definition = definition.id();
        } else if !column.nullable {
            definition = definition.required();
        }
        if property != column.name {
            definition = definition.column(&column.name);
        }
        descriptor.properties.insert(property, definition);
    }
    descriptor
}

/// 根据显式外键推断 `belongsTo` 关系
///
/// 返回模型名与推断出的关系。关系名为目标模型名的小驼峰形式，
/// 外键为本表外键列对应的属性名。目标表必须在 `known` 中，
/// 且外键必须指向它的主键。
pub fn infer_relations(
    table: &DiscoveredTable,
    known: &[DiscoveredTable],
) -> (String, BTreeMap<String, RelationDefinition>) {
    let mut relations = BTreeMap::new();
    for foreign_key in &table.foreign_keys {
        let Some(target) = known.iter().find(|t| t.name == foreign_key.target_table) else {
            debug!(
                "外键 {}.{} 的目标表 {} 不在本批次中，跳过关系推断",
                table.name, foreign_key.column, foreign_key.target_table
            );
            continue;
        };
        let references_primary_key = target
            .columns
            .iter()
            .any(|c| c.primary_key && c.name == foreign_key.target_column);
        if !references_primary_key {
            debug!(
                "外键 {}.{} 未指向 {} 的主键，跳过关系推断",
                table.name, foreign_key.column, target.name
            );
            continue;
        }

        let target_model = model_name_for_table(&foreign_key.target_table);
        let relation_name = target_model.to_lower_camel_case();
        let definition = RelationDefinition::belongs_to(&target_model)
            .foreign_key(&property_name_for_column(&foreign_key.column));
        relations.insert(relation_name, definition);
    }
    (model_name_for_table(&table.name), relations)
}
