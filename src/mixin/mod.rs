//! 混入注册
//!
//! 混入是具名的行为扩展，在组装模型之前注册到模型构建器。
//! 注册后，模型描述中的顶层 `mixins`/`indexes` 会被移动到 `options` 中，
//! 构建器只认 `options` 中的声明。

use crate::model::{ModelBuilder, ModelHandle};
use crate::types::SchemaDescriptor;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use rat_logger::{debug, info};

/// 框架专用的生命周期钩子混入，独立运行时没有对应能力
pub const RESERVED_HOOK_MIXINS: &[&str] = &["RemoteRouting"];

/// 混入函数，参数为模型句柄与该模型声明的混入选项
pub type MixinFn = Arc<dyn Fn(&ModelHandle, &Value) -> anyhow::Result<()> + Send + Sync>;

/// 混入表
#[derive(Clone, Default)]
pub struct MixinRegistry {
    mixins: BTreeMap<String, MixinFn>,
}

impl fmt::Debug for MixinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixinRegistry")
            .field("mixins", &self.mixins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MixinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加混入（链式）
    pub fn with<F>(mut self, name: &str, mixin: F) -> Self
    where
        F: Fn(&ModelHandle, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(mixin));
        self
    }

    pub fn register(&mut self, name: &str, mixin: MixinFn) {
        self.mixins.insert(name.to_string(), mixin);
    }

    pub fn get(&self, name: &str) -> Option<&MixinFn> {
        self.mixins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mixins.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.mixins.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mixins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mixins.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MixinFn)> {
        self.mixins.iter()
    }
}

/// 将全部混入注册到模型构建器
pub fn register_mixins(builder: &mut ModelBuilder, mixins: &MixinRegistry) {
    for (name, mixin) in mixins.iter() {
        debug!("注册混入: {}", name);
        builder.register_mixin(name, mixin.clone());
    }
    info!("已注册 {} 个混入", mixins.len());
}

/// 将顶层 `mixins`/`indexes` 移动到 `options`，并移除保留的钩子混入
pub fn relocate(descriptors: Vec<SchemaDescriptor>) -> Vec<SchemaDescriptor> {
    descriptors.into_iter().map(relocate_one).collect()
}

fn relocate_one(mut descriptor: SchemaDescriptor) -> SchemaDescriptor {
    if let Some(mut mixins) = descriptor.mixins.take() {
        for reserved in RESERVED_HOOK_MIXINS {
            if mixins.remove(*reserved).is_some() {
                debug!("模型 {} 移除框架钩子混入: {}", descriptor.name, reserved);
            }
        }
        descriptor.options.mixins = mixins;
    }
    if let Some(indexes) = descriptor.indexes.take() {
        descriptor.options.indexes = indexes;
    }
    descriptor
}
