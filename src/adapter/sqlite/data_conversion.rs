//! SQLite数据转换模块
//!
//! JSON值与SQLite存储类别之间的双向转换，转换规则由属性类型决定

use crate::error::{StandaloneError, StandaloneResult};
use crate::model::ModelDefinition;
use crate::types::{PropertyType, Record};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// 绑定参数
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// 属性类型对应的SQLite列类型
pub fn column_type(property_type: &PropertyType) -> &'static str {
    match property_type {
        PropertyType::String | PropertyType::Date => "TEXT",
        PropertyType::Number => "NUMERIC",
        PropertyType::Boolean => "INTEGER",
        PropertyType::Buffer => "BLOB",
        PropertyType::Object | PropertyType::Any | PropertyType::Array(_) | PropertyType::Model(_) => "TEXT",
    }
}

/// 列声明类型 -> 属性类型（按SQLite类型亲和规则）
pub fn property_type_for_declared(declared: &str) -> PropertyType {
    let declared = declared.to_uppercase();
    if declared.contains("JSON") {
        PropertyType::Object
    } else if declared.contains("BOOL") {
        PropertyType::Boolean
    } else if declared.contains("DATE") || declared.contains("TIME") {
        PropertyType::Date
    } else if declared.contains("INT") {
        PropertyType::Number
    } else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT") {
        PropertyType::String
    } else if declared.contains("BLOB") {
        PropertyType::Buffer
    } else if declared.is_empty() {
        PropertyType::Any
    } else {
        PropertyType::Number
    }
}

/// JSON值 -> 绑定参数
pub fn to_param(value: &Value, property_type: Option<&PropertyType>) -> SqlParam {
    let is_buffer = matches!(property_type, Some(PropertyType::Buffer));
    match value {
        Value::Null => SqlParam::Null,
        Value::Bool(b) => SqlParam::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlParam::Integer(i),
            None => SqlParam::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) if is_buffer => SqlParam::Blob(s.as_bytes().to_vec()),
        Value::String(s) => SqlParam::Text(s.clone()),
        Value::Array(items) if is_buffer => SqlParam::Blob(
            items
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|b| u8::try_from(b).ok())
                .collect(),
        ),
        other => SqlParam::Text(other.to_string()),
    }
}

/// 依次绑定参数
pub fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlParam],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Integer(i) => query.bind(*i),
            SqlParam::Real(f) => query.bind(*f),
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::Blob(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// 读取一行的原始值（按实际存储类别）
pub fn row_to_raw_record(row: &SqliteRow) -> StandaloneResult<Record> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index)?;
        let storage = if raw.is_null() {
            "NULL".to_string()
        } else {
            raw.type_info().name().to_uppercase()
        };

        let value = match storage.as_str() {
            "NULL" => Value::Null,
            "INTEGER" => Value::from(row.try_get::<i64, _>(index)?),
            "REAL" => Value::from(row.try_get::<f64, _>(index)?),
            "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(index)?),
            _ => Value::String(row.try_get::<String, _>(index)?),
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// 读取一行并按模型的属性类型还原
pub fn row_to_record(row: &SqliteRow, model: &ModelDefinition) -> StandaloneResult<Record> {
    let raw = row_to_raw_record(row)?;
    raw.into_iter()
        .map(|(column, value)| {
            let value = match model.property_by_column(&column) {
                Some(property) => from_storage(&column, value, &property.property_type)?,
                None => value,
            };
            Ok((column, value))
        })
        .collect()
}

fn from_storage(column: &str, value: Value, property_type: &PropertyType) -> StandaloneResult<Value> {
    if value.is_null() {
        return Ok(value);
    }
    let converted = match property_type {
        PropertyType::Boolean => match &value {
            Value::Number(n) => Value::Bool(n.as_i64().unwrap_or(0) != 0),
            Value::String(s) => Value::Bool(matches!(s.as_str(), "1" | "true" | "TRUE")),
            _ => value,
        },
        PropertyType::Object | PropertyType::Array(_) | PropertyType::Model(_) | PropertyType::Any => {
            match &value {
                Value::String(text)
                    if matches!(property_type, PropertyType::Any)
                        && !text.starts_with('{')
                        && !text.starts_with('[') =>
                {
                    value
                }
                Value::String(text) => match serde_json::from_str::<Value>(text) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        if !matches!(property_type, PropertyType::Any) {
                            return Err(StandaloneError::SerializationError {
                                message: format!("列 '{}' 不是有效的JSON: {}", column, e),
                            });
                        }
                        crate::debug_log!("列 '{}' 保持原始文本", column);
                        value
                    }
                },
                _ => value,
            }
        }
        _ => value,
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_param() {
        assert_eq!(to_param(&json!(true), Some(&PropertyType::Boolean)), SqlParam::Integer(1));
        assert_eq!(to_param(&json!(3), None), SqlParam::Integer(3));
        assert_eq!(to_param(&json!(1.5), None), SqlParam::Real(1.5));
        assert_eq!(to_param(&Value::Null, None), SqlParam::Null);
        assert_eq!(
            to_param(&json!({"a": 1}), Some(&PropertyType::Object)),
            SqlParam::Text("{\"a\":1}".to_string())
        );
        assert_eq!(
            to_param(&json!([1, 2]), Some(&PropertyType::Buffer)),
            SqlParam::Blob(vec![1, 2])
        );
    }

    #[test]
    fn test_declared_type_affinity() {
        assert_eq!(property_type_for_declared("INTEGER"), PropertyType::Number);
        assert_eq!(property_type_for_declared("varchar(255)"), PropertyType::String);
        assert_eq!(property_type_for_declared("DATETIME"), PropertyType::Date);
        assert_eq!(property_type_for_declared("BOOLEAN"), PropertyType::Boolean);
        assert_eq!(property_type_for_declared("BLOB"), PropertyType::Buffer);
        assert_eq!(property_type_for_declared(""), PropertyType::Any);
        assert_eq!(property_type_for_declared("DECIMAL(10,2)"), PropertyType::Number);
    }

    #[test]
    fn test_from_storage() {
        assert_eq!(
            from_storage("flag", json!(1), &PropertyType::Boolean).unwrap(),
            json!(true)
        );
        assert_eq!(
            from_storage("meta", json!("{\"a\":1}"), &PropertyType::Object).unwrap(),
            json!({"a": 1})
        );
        assert!(from_storage("meta", json!("oops"), &PropertyType::Object).is_err());
        assert_eq!(
            from_storage("free", json!("oops"), &PropertyType::Any).unwrap(),
            json!("oops")
        );
    }
}
