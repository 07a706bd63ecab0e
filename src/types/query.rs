//! 查询与元数据类型定义

use crate::types::schema::PropertyType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// 一条记录（属性名或列名 -> 值）
pub type Record = Map<String, Value>;

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// 排序配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: String,
    pub direction: SortDirection,
}

/// 查询过滤器
///
/// `conditions` 中的值为数组时表示 IN，其余表示相等（`null` 表示 IS NULL）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "where", default)]
    pub conditions: BTreeMap<String, Value>,
    #[serde(default)]
    pub order: Option<SortConfig>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub skip: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加相等条件
    pub fn eq(mut self, field: &str, value: Value) -> Self {
        self.conditions.insert(field.to_string(), value);
        self
    }

    /// 添加 IN 条件
    pub fn within(mut self, field: &str, values: Vec<Value>) -> Self {
        self.conditions.insert(field.to_string(), Value::Array(values));
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order = Some(SortConfig {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    /// 判断一条记录是否满足全部条件
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            let actual = record.get(field).unwrap_or(&Value::Null);
            match expected {
                Value::Array(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
                other => values_equal(actual, other),
            }
        })
    }
}

/// 值比较：数字按数值比较，其余按JSON相等
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}

/// 值排序：null 最小，数字按数值，字符串按字典序，其余视为相等
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// 表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Table,
    View,
}

/// 表级描述（逆向发现的第一步）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub kind: TableKind,
    pub owner: Option<String>,
}

impl TableDescriptor {
    pub fn table(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TableKind::Table,
            owner: None,
        }
    }
}

/// 逆向发现选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOptions {
    /// 是否根据外键推断关系，并一并发现被引用的表
    pub relations: bool,
    /// 是否包含视图
    pub views: bool,
    /// 限定所有者/模式
    pub owner: Option<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            relations: true,
            views: false,
            owner: None,
        }
    }
}

/// 发现到的列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredColumn {
    pub name: String,
    pub data_type: PropertyType,
    pub nullable: bool,
    pub primary_key: bool,
}

/// 显式外键约束
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// 本表列
    pub column: String,
    /// 被引用的表
    pub target_table: String,
    /// 被引用的列
    pub target_column: String,
}

/// 发现到的表结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredTable {
    pub name: String,
    pub columns: Vec<DiscoveredColumn>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_equality_and_in() {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(3));
        record.insert("status".to_string(), json!("open"));

        assert!(Filter::new().eq("id", json!(3.0)).matches(&record));
        assert!(Filter::new().within("status", vec![json!("open"), json!("closed")]).matches(&record));
        assert!(!Filter::new().eq("status", json!("closed")).matches(&record));
        assert!(Filter::new().eq("missing", Value::Null).matches(&record));
    }

    #[test]
    fn test_compare_values_orders_nulls_first() {
        assert_eq!(compare_values(&Value::Null, &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
