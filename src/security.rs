//! 标识符安全验证工具
//!
//! 模型名、表名与列名最终会拼接进DDL/DML语句，
//! 这里统一校验其字符集与长度，并生成带引号的安全标识符。

use crate::error::{StandaloneError, StandaloneResult};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("标识符正则无效: {}", e))
});

/// 标识符最大长度
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// 标识符类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Model,
    Table,
    Column,
}

impl IdentifierKind {
    fn label(&self) -> &'static str {
        match self {
            IdentifierKind::Model => "模型名",
            IdentifierKind::Table => "表名",
            IdentifierKind::Column => "列名",
        }
    }
}

/// 是否为合法的标识符
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENTIFIER_LEN && IDENTIFIER_PATTERN.is_match(name)
}

/// 验证标识符的安全性
///
/// # 返回值
/// * `Ok(())` - 标识符安全
/// * `Err(StandaloneError::ValidationError)` - 标识符为空、过长或包含非法字符
pub fn validate_identifier(kind: IdentifierKind, name: &str) -> StandaloneResult<()> {
    if name.is_empty() {
        return Err(StandaloneError::ValidationError {
            field: kind.label().to_string(),
            message: format!("{}不能为空", kind.label()),
        });
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(StandaloneError::ValidationError {
            field: name.to_string(),
            message: format!("{}长度不能超过{}个字符", kind.label(), MAX_IDENTIFIER_LEN),
        });
    }

    if let Some(first) = name.chars().next() {
        if first.is_ascii_digit() {
            return Err(StandaloneError::ValidationError {
                field: name.to_string(),
                message: format!("{}不能以数字开头", kind.label()),
            });
        }
    }

    for (i, ch) in name.chars().enumerate() {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(StandaloneError::ValidationError {
                field: name.to_string(),
                message: format!("{}包含非法字符 '{}' 在位置 {}", kind.label(), ch, i),
            });
        }
    }

    Ok(())
}

/// 获取带双引号的安全SQL标识符
pub fn quote_identifier(kind: IdentifierKind, name: &str) -> StandaloneResult<String> {
    validate_identifier(kind, name)?;
    Ok(format!("\"{}\"", name))
}
