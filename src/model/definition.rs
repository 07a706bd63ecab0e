//! 已解析的模型定义
//!
//! 模型描述经过组装后得到的完整定义：继承后的属性、主键、表名与索引。
//! 驱动只接触列名，属性名与列名之间的映射在这里完成。

use crate::error::StandaloneResult;
use crate::types::{Filter, ModelOptions, PropertyDefinition, Record, SortConfig};
use serde_json::Value;
use std::collections::BTreeMap;

/// 索引定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// 索引名
    pub name: String,
    /// 索引包含的属性
    pub properties: Vec<String>,
    /// 是否唯一索引
    pub unique: bool,
}

impl IndexDefinition {
    /// 从 `options.indexes` 中的一项解析
    ///
    /// 支持三种写法：
    /// `{"keys": {"a": 1}, "options": {"unique": true}}`、
    /// `{"columns": "a,b", "kind": "unique"}`、以及直接的 `{"a": 1, "b": -1}`。
    pub fn from_value(model: &str, name: &str, value: &Value) -> StandaloneResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            crate::quick_error!(schema, model, format!("索引 '{}' 必须是对象", name))
        })?;

        let mut unique = object
            .get("unique")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if let Some(options) = object.get("options").and_then(Value::as_object) {
            unique |= options.get("unique").and_then(Value::as_bool).unwrap_or(false);
        }
        if object.get("kind").and_then(Value::as_str) == Some("unique") {
            unique = true;
        }

        let properties: Vec<String> = if let Some(keys) = object.get("keys") {
            keys.as_object()
                .map(|k| k.keys().cloned().collect())
                .unwrap_or_default()
        } else if let Some(columns) = object.get("columns") {
            match columns {
                Value::String(s) => s
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            }
        } else {
            object
                .keys()
                .filter(|k| !matches!(k.as_str(), "unique" | "options" | "kind"))
                .cloned()
                .collect()
        };

        if properties.is_empty() {
            return Err(crate::quick_error!(
                schema,
                model,
                format!("索引 '{}' 没有声明任何字段", name)
            ));
        }

        Ok(Self {
            name: name.to_string(),
            properties,
            unique,
        })
    }
}

/// 已解析的模型定义
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    /// 模型名
    pub name: String,
    /// 表名/集合名
    pub table: String,
    /// 基类名
    pub base: Option<String>,
    /// 属性（包含继承的属性与隐式主键）
    pub properties: BTreeMap<String, PropertyDefinition>,
    /// 主键属性名
    pub id_property: String,
    /// 主键是否由数据库生成
    pub id_generated: bool,
    /// 索引
    pub indexes: Vec<IndexDefinition>,
    /// 原始选项
    pub settings: ModelOptions,
}

impl ModelDefinition {
    /// 属性对应的列名
    pub fn column_name<'a>(&'a self, property: &'a str) -> &'a str {
        self.properties
            .get(property)
            .and_then(|p| p.column.as_deref())
            .unwrap_or(property)
    }

    /// 主键列名
    pub fn id_column(&self) -> &str {
        self.column_name(&self.id_property)
    }

    /// 列对应的属性名
    pub fn property_for_column(&self, column: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(name, p)| p.column.as_deref().unwrap_or(name.as_str()) == column)
            .map(|(name, _)| name.as_str())
    }

    /// 全部列及其属性定义
    pub fn columns(&self) -> Vec<(&str, &PropertyDefinition)> {
        self.properties
            .iter()
            .map(|(name, p)| (p.column.as_deref().unwrap_or(name.as_str()), p))
            .collect()
    }

    /// 按列名取属性定义
    pub fn property_by_column(&self, column: &str) -> Option<&PropertyDefinition> {
        self.property_for_column(column)
            .and_then(|name| self.properties.get(name))
    }

    /// 索引涉及的列名
    pub fn index_columns(&self, index: &IndexDefinition) -> Vec<String> {
        index
            .properties
            .iter()
            .map(|p| self.column_name(p).to_string())
            .collect()
    }

    /// 属性名记录 -> 列名记录
    pub fn to_columns(&self, record: &Record) -> Record {
        record
            .iter()
            .map(|(k, v)| (self.column_name(k).to_string(), v.clone()))
            .collect()
    }

    /// 列名记录 -> 属性名记录
    pub fn from_columns(&self, row: Record) -> Record {
        row.into_iter()
            .map(|(column, v)| {
                let name = self
                    .property_for_column(&column)
                    .map(str::to_string)
                    .unwrap_or(column);
                (name, v)
            })
            .collect()
    }

    /// 将过滤器中的属性名替换为列名
    pub fn filter_to_columns(&self, filter: &Filter) -> Filter {
        Filter {
            conditions: filter
                .conditions
                .iter()
                .map(|(k, v)| (self.column_name(k).to_string(), v.clone()))
                .collect(),
            order: filter.order.as_ref().map(|o| SortConfig {
                field: self.column_name(&o.field).to_string(),
                direction: o.direction,
            }),
            limit: filter.limit,
            skip: filter.skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_forms() {
        let keys = IndexDefinition::from_value(
            "User",
            "email_idx",
            &json!({"keys": {"email": 1}, "options": {"unique": true}}),
        )
        .unwrap();
        assert_eq!(keys.properties, vec!["email".to_string()]);
        assert!(keys.unique);

        let columns =
            IndexDefinition::from_value("User", "name_idx", &json!({"columns": "first, last"}))
                .unwrap();
        assert_eq!(columns.properties, vec!["first".to_string(), "last".to_string()]);
        assert!(!columns.unique);

        let direct = IndexDefinition::from_value("User", "age_idx", &json!({"age": -1})).unwrap();
        assert_eq!(direct.properties, vec!["age".to_string()]);

        assert!(IndexDefinition::from_value("User", "bad", &json!("age")).is_err());
        assert!(IndexDefinition::from_value("User", "empty", &json!({"keys": {}})).is_err());
    }
}
