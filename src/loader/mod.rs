//! 模型描述加载
//!
//! 读取模型目录下的 `.json` 文件，每个文件一个模型描述。
//! 文件按文件名排序后依次解析，基类需要先于子类出现时请据此命名文件。

use crate::error::{StandaloneError, StandaloneResult};
use crate::i18n::tf;
use crate::types::SchemaDescriptor;
use std::path::{Path, PathBuf};
use rat_logger::{debug, info};

/// 可识别的模型描述扩展名
pub const SCHEMA_EXTENSION: &str = "json";

/// 列出目录下的模型描述文件（按文件名排序）
pub fn schema_files(dir: &Path) -> StandaloneResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_schema = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(SCHEMA_EXTENSION);
        if is_schema {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// 解析单个模型描述文件
pub fn load_schema_file(path: &Path) -> StandaloneResult<SchemaDescriptor> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| StandaloneError::ParseError {
        path: path.display().to_string(),
        message: tf("error.parse_schema", &[("message", &e.to_string())]),
    })
}

/// 加载目录下的全部模型描述
///
/// 目录不可读时返回 `IoError`，任一文件格式错误时返回 `ParseError`，均不做恢复。
pub fn load_schemas<P: AsRef<Path>>(dir: P) -> StandaloneResult<Vec<SchemaDescriptor>> {
    let dir = dir.as_ref();
    let files = schema_files(dir)?;
    let mut schemas = Vec::with_capacity(files.len());
    for path in &files {
        let descriptor = load_schema_file(path)?;
        debug!("加载模型描述: {} <- {}", descriptor.name, path.display());
        schemas.push(descriptor);
    }
    info!("从 {} 加载 {} 个模型描述", dir.display(), schemas.len());
    Ok(schemas)
}
