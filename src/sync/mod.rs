//! 表结构同步
//!
//! 先检查存储结构是否已与模型一致，不一致时执行增量更新。
//! 增量更新只会建表、加列、建索引，不会删除任何表、列或数据。
//! 同一个库上的两次同步不得并发执行，本层不做任何加锁。

use crate::error::{StandaloneError, StandaloneResult};
use crate::i18n::t;
use crate::model::{ModelCollection, ModelDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use rat_logger::info;

/// 同步结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// 已一致，未做任何修改
    NoOp,
    /// 执行了增量更新
    Updated,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::NoOp => "no-op",
            SyncStatus::Updated => "updated",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 同步结果
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub models: ModelCollection,
}

/// 同步模型集合对应的存储结构
pub async fn sync_models(models: ModelCollection) -> StandaloneResult<SyncOutcome> {
    if models.is_empty() {
        return Err(StandaloneError::EmptyModelSetError {
            message: t("error.empty_model_set"),
        });
    }

    let connection = models.connection().ok_or_else(|| {
        crate::quick_error!(config, t("error.sync_unbound"))
    })?;
    let definitions: Vec<ModelDefinition> = models.iter().map(|(_, m)| m.definition()).collect();

    let status = if connection.is_actual(&definitions).await? {
        SyncStatus::NoOp
    } else {
        connection.autoupdate(&definitions).await?;
        SyncStatus::Updated
    };

    info!("连接 {} 同步完成: {}", connection.name(), status);
    Ok(SyncOutcome { status, models })
}
