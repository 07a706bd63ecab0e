//! 错误类型定义模块
//!
//! 独立数据访问层的统一错误类型。同步流程中的错误直接返回给调用者，
//! 异步流程（同步表结构、逆向发现）中的错误通过返回的 future 传递。

use thiserror::Error;

/// 独立数据访问层错误
#[derive(Error, Debug)]
pub enum StandaloneError {
    /// 模型目录不可读等IO错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 模型描述文件格式错误
    #[error("解析模型描述失败 [{path}]: {message}")]
    ParseError { path: String, message: String },

    /// 模型组装错误（未定义的类型、基类、混入或关系目标）
    #[error("模型定义错误 [{model}]: {message}")]
    SchemaError { model: String, message: String },

    /// 没有可同步的模型
    #[error("{message}")]
    EmptyModelSetError { message: String },

    /// 连接层的瞬时错误，只会被投递到连接的错误监听器
    #[error("数据库连接错误: {message}")]
    ConnectivityError { message: String },

    /// 逆向发现中任意一张表失败
    #[error("逆向发现表 '{table}' 失败: {message}")]
    DiscoveryError { table: String, message: String },

    /// 模型自定义逻辑执行失败
    #[error("模型 '{model}' 的自定义逻辑执行失败: {message}")]
    CustomizationError { model: String, message: String },

    /// 配置错误
    #[error("配置错误: {message}")]
    ConfigError { message: String },

    /// 查询执行失败
    #[error("查询执行失败: {message}")]
    QueryError { message: String },

    /// 数据验证失败
    #[error("数据验证失败: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// 不支持的连接器
    #[error("不支持的连接器: {connector}")]
    UnsupportedConnector { connector: String },

    /// 序列化失败
    #[error("数据序列化失败: {message}")]
    SerializationError { message: String },
}

/// 结果类型别名
pub type StandaloneResult<T> = Result<T, StandaloneError>;

impl StandaloneError {
    /// 是否为连接层的瞬时错误
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StandaloneError::ConnectivityError { .. })
    }

    /// 出错的模型名（仅对模型相关错误有效）
    pub fn model(&self) -> Option<&str> {
        match self {
            StandaloneError::SchemaError { model, .. }
            | StandaloneError::CustomizationError { model, .. } => Some(model),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StandaloneError {
    fn from(e: serde_json::Error) -> Self {
        StandaloneError::SerializationError {
            message: e.to_string(),
        }
    }
}

#[cfg(feature = "sqlite-support")]
impl From<sqlx::Error> for StandaloneError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StandaloneError::ConnectivityError {
                message: e.to_string(),
            },
            other => StandaloneError::QueryError {
                message: other.to_string(),
            },
        }
    }
}

/// 快速构建常用错误
#[macro_export]
macro_rules! quick_error {
    (config, $msg:expr) => {
        $crate::error::StandaloneError::ConfigError {
            message: $msg.to_string(),
        }
    };
    (schema, $model:expr, $msg:expr) => {
        $crate::error::StandaloneError::SchemaError {
            model: $model.to_string(),
            message: $msg.to_string(),
        }
    };
    (query, $msg:expr) => {
        $crate::error::StandaloneError::QueryError {
            message: $msg.to_string(),
        }
    };
    (validation, $field:expr, $msg:expr) => {
        $crate::error::StandaloneError::ValidationError {
            field: $field.to_string(),
            message: $msg.to_string(),
        }
    };
    (connectivity, $msg:expr) => {
        $crate::error::StandaloneError::ConnectivityError {
            message: $msg.to_string(),
        }
    };
    (unsupported_connector, $connector:expr) => {
        $crate::error::StandaloneError::UnsupportedConnector {
            connector: $connector.to_string(),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_error_builds_variants() {
        let err = quick_error!(schema, "Order", "未定义的基类");
        assert!(matches!(err, StandaloneError::SchemaError { .. }));
        assert_eq!(err.model(), Some("Order"));

        let err = quick_error!(connectivity, "connection reset");
        assert!(err.is_connectivity());
        assert!(err.model().is_none());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StandaloneError = io.into();
        assert!(matches!(err, StandaloneError::IoError(_)));
    }
}
