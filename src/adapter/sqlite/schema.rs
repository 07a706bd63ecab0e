//! SQLite表结构操作
//!
//! 建表、加列、建索引以及基于 `pragma_*` 表值函数的结构读取

use crate::adapter::sqlite::data_conversion::{column_type, property_type_for_declared};
use crate::adapter::SchemaDiff;
use crate::error::{StandaloneError, StandaloneResult};
use crate::model::{IndexDefinition, ModelDefinition};
use crate::security::{quote_identifier, IdentifierKind};
use crate::types::{
    DiscoveredColumn, DiscoveredTable, DiscoveryOptions, ForeignKeyDescriptor, PropertyType,
    TableDescriptor, TableKind,
};
use rat_logger::{debug, info};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// 表是否存在
pub(crate) async fn table_exists(pool: &SqlitePool, table: &str) -> StandaloneResult<bool> {
    let row = sqlx::query("SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?")
        .bind(table)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// 现有列名，表不存在时返回 `None`
pub(crate) async fn live_columns(pool: &SqlitePool, table: &str) -> StandaloneResult<Option<Vec<String>>> {
    if !table_exists(pool, table).await? {
        return Ok(None);
    }
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    let columns = rows
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(columns))
}

/// 现有索引名
pub(crate) async fn live_indexes(pool: &SqlitePool, table: &str) -> StandaloneResult<Vec<String>> {
    let rows = sqlx::query("SELECT name FROM pragma_index_list(?)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<Vec<_>, _>>()?)
}

/// 计算模型与现有结构的差异
pub(crate) async fn diff(pool: &SqlitePool, model: &ModelDefinition) -> StandaloneResult<SchemaDiff> {
    let columns = live_columns(pool, &model.table).await?;
    let indexes = live_indexes(pool, &model.table).await?;
    Ok(SchemaDiff::compute(model, columns.as_deref(), &indexes))
}

fn column_ddl(model: &ModelDefinition, column: &str, for_create: bool) -> StandaloneResult<String> {
    let quoted = quote_identifier(IdentifierKind::Column, column)?;
    let property = model.property_by_column(column);
    let property_type = property.map(|p| p.property_type.clone()).unwrap_or_default();
    let sql_type = column_type(&property_type);

    if for_create && column == model.id_column() {
        if model.id_generated && property_type == PropertyType::Number {
            return Ok(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quoted));
        }
        return Ok(format!("{} {} PRIMARY KEY NOT NULL", quoted, sql_type));
    }

    let required = for_create && property.map(|p| p.required).unwrap_or(false);
    if required {
        Ok(format!("{} {} NOT NULL", quoted, sql_type))
    } else {
        Ok(format!("{} {}", quoted, sql_type))
    }
}

/// 创建表
pub(crate) async fn create_table(pool: &SqlitePool, model: &ModelDefinition) -> StandaloneResult<()> {
    let table = quote_identifier(IdentifierKind::Table, &model.table)?;
    let columns = model
        .columns()
        .into_iter()
        .map(|(column, _)| column_ddl(model, column, true))
        .collect::<StandaloneResult<Vec<_>>>()?;

    let sql = format!("CREATE TABLE IF NOT EXISTS {} ({})", table, columns.join(", "));
    debug!("执行SQLite建表SQL: {}", sql);
    sqlx::query(&sql).execute(pool).await?;
    info!("创建SQLite表: {}", model.table);
    Ok(())
}

/// 新增可空列
pub(crate) async fn add_column(pool: &SqlitePool, model: &ModelDefinition, column: &str) -> StandaloneResult<()> {
    let table = quote_identifier(IdentifierKind::Table, &model.table)?;
    let sql = format!("ALTER TABLE {} ADD COLUMN {}", table, column_ddl(model, column, false)?);
    debug!("执行SQLite加列SQL: {}", sql);
    sqlx::query(&sql).execute(pool).await?;
    info!("SQLite表 {} 新增列: {}", model.table, column);
    Ok(())
}

/// 创建索引
pub(crate) async fn create_index(
    pool: &SqlitePool,
    model: &ModelDefinition,
    index: &IndexDefinition,
) -> StandaloneResult<()> {
    let table = quote_identifier(IdentifierKind::Table, &model.table)?;
    let name = quote_identifier(IdentifierKind::Table, &index.name)?;
    let columns = model
        .index_columns(index)
        .iter()
        .map(|c| quote_identifier(IdentifierKind::Column, c))
        .collect::<StandaloneResult<Vec<_>>>()?;
    let unique_keyword = if index.unique { "UNIQUE " } else { "" };

    let sql = format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        unique_keyword,
        name,
        table,
        columns.join(", ")
    );
    debug!("执行SQLite建索引SQL: {}", sql);
    sqlx::query(&sql).execute(pool).await?;
    info!("SQLite表 {} 新建索引: {}", model.table, index.name);
    Ok(())
}

/// 按差异增量更新
pub(crate) async fn apply(pool: &SqlitePool, model: &ModelDefinition, diff: &SchemaDiff) -> StandaloneResult<()> {
    if diff.create_table {
        create_table(pool, model).await?;
    }
    for column in &diff.missing_columns {
        add_column(pool, model, column).await?;
    }
    for index in &diff.missing_indexes {
        create_index(pool, model, index).await?;
    }
    Ok(())
}

/// 列出表与视图
pub(crate) async fn list_tables(
    pool: &SqlitePool,
    options: &DiscoveryOptions,
) -> StandaloneResult<Vec<TableDescriptor>> {
    let rows = sqlx::query(
        "SELECT name, type FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        let kind = match row.try_get::<String, _>("type")?.as_str() {
            "view" => TableKind::View,
            _ => TableKind::Table,
        };
        if kind == TableKind::View && !options.views {
            continue;
        }
        tables.push(TableDescriptor {
            name,
            kind,
            owner: options.owner.clone(),
        });
    }
    Ok(tables)
}

/// 读取单张表的列与外键
pub(crate) async fn describe_table(pool: &SqlitePool, table: &str) -> StandaloneResult<DiscoveredTable> {
    if !table_exists(pool, table).await? {
        return Err(StandaloneError::DiscoveryError {
            table: table.to_string(),
            message: "表不存在".to_string(),
        });
    }

    let rows = sqlx::query("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let declared: String = row.try_get("type")?;
        let not_null: i64 = row.try_get("notnull")?;
        let pk: i64 = row.try_get("pk")?;
        columns.push(DiscoveredColumn {
            name: row.try_get("name")?,
            data_type: property_type_for_declared(&declared),
            nullable: not_null == 0 && pk == 0,
            primary_key: pk > 0,
        });
    }

    let rows = sqlx::query("SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    let mut foreign_keys = Vec::with_capacity(rows.len());
    for row in rows {
        let target_column: Option<String> = row.try_get("to")?;
        foreign_keys.push(ForeignKeyDescriptor {
            column: row.try_get("from")?,
            target_table: row.try_get("table")?,
            target_column: target_column.unwrap_or_else(|| "id".to_string()),
        });
    }

    Ok(DiscoveredTable {
        name: table.to_string(),
        columns,
        foreign_keys,
    })
}
