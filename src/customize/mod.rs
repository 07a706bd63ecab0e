//! 模型自定义逻辑
//!
//! 自定义逻辑按模型名的 kebab-case 形式登记，例如 `UserProfile` 对应 `user-profile`，
//! 相当于模型目录下的 `<modelsPath>/user-profile`。找到时先安装独立运行的远程钩子宿主，
//! 再以模型句柄为唯一参数调用。

use crate::error::{StandaloneError, StandaloneResult};
use crate::model::{ModelCollection, ModelHandle, StandaloneHooks};
use heck::ToKebabCase;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use rat_logger::{debug, info};

/// 自定义函数
pub type CustomizationFn = Arc<dyn Fn(&ModelHandle) -> anyhow::Result<()> + Send + Sync>;

/// 模型名 -> 文件名安全的 kebab-case 形式
///
/// 连续大写视为一个缩写：`HTTPRequest` -> `http-request`；已经是 kebab-case 的输入保持不变。
pub fn model_slug(name: &str) -> String {
    name.to_kebab_case()
}

/// 自定义逻辑表（slug -> 函数）
#[derive(Clone, Default)]
pub struct CustomizationRegistry {
    entries: BTreeMap<String, CustomizationFn>,
}

impl fmt::Debug for CustomizationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomizationRegistry")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CustomizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按模型名登记，内部转换为 slug
    pub fn with<F>(mut self, model: &str, customization: F) -> Self
    where
        F: Fn(&ModelHandle) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(model, Arc::new(customization));
        self
    }

    pub fn register(&mut self, model: &str, customization: CustomizationFn) {
        self.entries.insert(model_slug(model), customization);
    }

    pub fn get(&self, model: &str) -> Option<&CustomizationFn> {
        self.entries.get(&model_slug(model))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.entries.contains_key(&model_slug(model))
    }

    pub fn slugs(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 对每个模型执行其自定义逻辑
///
/// 自定义函数返回的错误不在此处理，包装为 `CustomizationError` 后直接返回。
pub fn load_customizations(
    models: &ModelCollection,
    registry: &CustomizationRegistry,
    models_path: Option<&Path>,
) -> StandaloneResult<()> {
    for (name, model) in models {
        let slug = model_slug(name);
        let Some(customization) = registry.get(name) else {
            continue;
        };

        let location = models_path
            .map(|p| p.join(&slug).display().to_string())
            .unwrap_or_else(|| slug.clone());
        debug!("加载模型 {} 的自定义逻辑: {}", name, location);

        model.install_remote_hooks(Arc::new(StandaloneHooks));
        customization(model).map_err(|e| StandaloneError::CustomizationError {
            model: name.clone(),
            message: e.to_string(),
        })?;
        info!("模型 {} 的自定义逻辑执行完成", name);
    }
    Ok(())
}
