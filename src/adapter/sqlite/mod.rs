//! SQLite连接器
//!
//! 使用sqlx实现真实的SQLite数据库操作。连接池以惰性方式创建，
//! 第一次执行语句时才真正建立连接。

mod data_conversion;
mod query;
mod schema;

use crate::adapter::Connector;
use crate::error::{StandaloneError, StandaloneResult};
use crate::i18n::tf;
use crate::model::ModelDefinition;
use crate::types::{
    DiscoveredTable, DiscoveryOptions, DriverSettings, Filter, Record, TableDescriptor,
};
use async_trait::async_trait;
use data_conversion::{bind_params, row_to_record};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use rat_logger::{debug, info};

/// 文件型数据库的默认最大连接数
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite连接器
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    pool: SqlitePool,
    file: String,
}

impl SqliteConnector {
    /// 根据驱动配置创建连接器
    ///
    /// 识别的参数：`file`（或 `database`）、`create_if_missing`（默认 true）、
    /// `max_connections`。`file` 为 `:memory:` 时使用单连接的内存数据库。
    pub fn open(settings: &DriverSettings) -> StandaloneResult<Self> {
        let file = settings
            .get("file")
            .or_else(|| settings.get("database"))
            .and_then(Value::as_str)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| StandaloneError::ConfigError {
                message: crate::i18n::t("error.sqlite_file_missing"),
            })?
            .to_string();

        let in_memory = file == ":memory:";
        let base_options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| StandaloneError::ConfigError {
                message: tf("error.sqlite_connection", &[("message", &e.to_string())]),
            })?
        } else {
            let create_if_missing = settings
                .get("create_if_missing")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            SqliteConnectOptions::new()
                .filename(&file)
                .create_if_missing(create_if_missing)
        };
        let options = base_options.foreign_keys(true);

        let max_connections = if in_memory {
            1
        } else {
            settings
                .get("max_connections")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(0)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_lazy_with(options);

        info!("SQLite连接池已创建（惰性连接）: {}", file);
        Ok(Self { pool, file })
    }

    /// 数据库文件路径
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    fn driver(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, model: &ModelDefinition, row: Record) -> StandaloneResult<Record> {
        let (sql, params) = query::insert(model, &row)?;
        debug!("执行SQLite插入SQL: {}", sql);
        let row = bind_params(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await?;
        row_to_record(&row, model)
    }

    async fn find(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<Vec<Record>> {
        let (sql, params) = query::select(model, filter)?;
        debug!("执行SQLite查询SQL: {}", sql);
        let rows = bind_params(sqlx::query(&sql), &params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| row_to_record(row, model)).collect()
    }

    async fn count(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        let (sql, params) = query::count(model, filter)?;
        debug!("执行SQLite计数SQL: {}", sql);
        let row = bind_params(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn destroy(&self, model: &ModelDefinition, filter: &Filter) -> StandaloneResult<u64> {
        let (sql, params) = query::delete(model, filter)?;
        debug!("执行SQLite删除SQL: {}", sql);
        let result = bind_params(sqlx::query(&sql), &params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn is_actual(&self, models: &[ModelDefinition]) -> StandaloneResult<bool> {
        for model in models {
            if !schema::diff(&self.pool, model).await?.is_empty() {
                debug!("SQLite表 {} 与模型不一致", model.table);
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn autoupdate(&self, models: &[ModelDefinition]) -> StandaloneResult<()> {
        for model in models {
            let diff = schema::diff(&self.pool, model).await?;
            if !diff.is_empty() {
                schema::apply(&self.pool, model, &diff).await?;
            }
        }
        Ok(())
    }

    async fn discover_model_definitions(
        &self,
        options: &DiscoveryOptions,
    ) -> StandaloneResult<Vec<TableDescriptor>> {
        schema::list_tables(&self.pool, options).await
    }

    async fn discover_table(
        &self,
        table: &str,
        _options: &DiscoveryOptions,
    ) -> StandaloneResult<DiscoveredTable> {
        schema::describe_table(&self.pool, table).await
    }

    async fn disconnect(&self) -> StandaloneResult<()> {
        self.pool.close().await;
        info!("SQLite连接池已关闭: {}", self.file);
        Ok(())
    }
}
