//! SQLite语句构建
//!
//! 所有标识符都经过校验并加引号，所有值都以参数形式绑定。

use crate::adapter::sqlite::data_conversion::{to_param, SqlParam};
use crate::error::StandaloneResult;
use crate::model::ModelDefinition;
use crate::security::{quote_identifier, IdentifierKind};
use crate::types::{Filter, Record, SortDirection};
use serde_json::Value;

/// 构建 WHERE / ORDER BY / LIMIT 子句
pub fn filter_clause(model: &ModelDefinition, filter: &Filter) -> StandaloneResult<(String, Vec<SqlParam>)> {
    let mut sql = String::new();
    let mut params = Vec::new();
    let mut predicates = Vec::new();

    for (column, value) in &filter.conditions {
        let quoted = quote_identifier(IdentifierKind::Column, column)?;
        let property_type = model.property_by_column(column).map(|p| &p.property_type);
        match value {
            Value::Null => predicates.push(format!("{} IS NULL", quoted)),
            Value::Array(items) if items.is_empty() => predicates.push("0 = 1".to_string()),
            Value::Array(items) => {
                let placeholders = vec!["?"; items.len()].join(", ");
                predicates.push(format!("{} IN ({})", quoted, placeholders));
                params.extend(items.iter().map(|item| to_param(item, property_type)));
            }
            other => {
                predicates.push(format!("{} = ?", quoted));
                params.push(to_param(other, property_type));
            }
        }
    }

    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if let Some(order) = &filter.order {
        let direction = match order.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY {} {}",
            quote_identifier(IdentifierKind::Column, &order.field)?,
            direction
        ));
    }

    match (filter.limit, filter.skip) {
        (Some(limit), Some(skip)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, skip)),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
        (None, Some(skip)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", skip)),
        (None, None) => {}
    }

    Ok((sql, params))
}

/// SELECT 语句
pub fn select(model: &ModelDefinition, filter: &Filter) -> StandaloneResult<(String, Vec<SqlParam>)> {
    let table = quote_identifier(IdentifierKind::Table, &model.table)?;
    let (clause, params) = filter_clause(model, filter)?;
    Ok((format!("SELECT * FROM {}{}", table, clause), params))
}

/// COUNT 语句
pub fn count(model: &ModelDefinition, filter: &Filter) -> StandaloneResult<(String, Vec<SqlParam>)> {
    let table = quote_identifier(IdentifierKind::Table, &model.table)?;
    let counted = Filter {
        conditions: filter.conditions.clone(),
        ..Filter::default()
    };
    let (clause, params) = filter_clause(model, &counted)?;
    Ok((format!("SELECT COUNT(*) AS total FROM {}{}", table, clause), params))
}

/// DELETE 语句
pub fn delete(model: &ModelDefinition, filter: &Filter) -> StandaloneResult<(String, Vec<SqlParam>)> {
    let table = quote_identifier(IdentifierKind::Table, &model.table)?;
    let scoped = Filter {
        conditions: filter.conditions.clone(),
        ..Filter::default()
    };
    let (clause, params) = filter_clause(model, &scoped)?;
    Ok((format!("DELETE FROM {}{}", table, clause), params))
}

/// INSERT ... RETURNING 语句
pub fn insert(model: &ModelDefinition, row: &Record) -> StandaloneResult<(String, Vec<SqlParam>)> {
    let table = quote_identifier(IdentifierKind::Table, &model.table)?;
    let values: Vec<(&String, &Value)> = row.iter().filter(|(_, v)| !v.is_null()).collect();
    if values.is_empty() {
        return Ok((format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table), Vec::new()));
    }

    let mut columns = Vec::with_capacity(values.len());
    let mut params = Vec::with_capacity(values.len());
    for (column, value) in values {
        columns.push(quote_identifier(IdentifierKind::Column, column)?);
        let property_type = model.property_by_column(column).map(|p| &p.property_type);
        params.push(to_param(value, property_type));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        table,
        columns.join(", "),
        vec!["?"; params.len()].join(", ")
    );
    Ok((sql, params))
}
