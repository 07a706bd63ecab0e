//! 远程钩子宿主
//!
//! 为完整Web框架编写的模型自定义代码会调用 `remote_method`、`before_remote`
//! 与 `after_remote`。在独立运行时这些能力没有意义，由 [`StandaloneHooks`]
//! 提供空实现；宿主框架可以安装自己的 [`RemoteHooks`] 实现。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use rat_logger::debug;

/// 宿主类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookHostKind {
    /// 独立运行，所有钩子都是空操作
    Standalone,
    /// 由完整框架提供
    Framework,
}

/// 远程方法声明
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteMethodSpec {
    /// 参数名
    #[serde(default)]
    pub accepts: Vec<String>,
    /// 返回值名
    #[serde(default)]
    pub returns: Option<String>,
    /// HTTP 路径
    #[serde(default)]
    pub http_path: Option<String>,
    /// HTTP 方法
    #[serde(default)]
    pub http_verb: Option<String>,
}

/// 远程调用上下文
#[derive(Debug, Clone, Default)]
pub struct RemoteContext {
    pub method: String,
    pub args: Value,
    pub result: Option<Value>,
}

/// 远程钩子回调
pub type RemoteHookFn = Arc<dyn Fn(&mut RemoteContext) -> anyhow::Result<()> + Send + Sync>;

/// 远程钩子宿主能力
pub trait RemoteHooks: Send + Sync {
    /// 宿主类型
    fn kind(&self) -> HookHostKind;

    /// 注册远程方法
    fn remote_method(&self, model: &str, name: &str, spec: RemoteMethodSpec);

    /// 注册远程调用前置钩子
    fn before_remote(&self, model: &str, pattern: &str, hook: RemoteHookFn);

    /// 注册远程调用后置钩子
    fn after_remote(&self, model: &str, pattern: &str, hook: RemoteHookFn);
}

/// 独立运行时的空实现
#[derive(Debug, Clone, Copy, Default)]
pub struct StandaloneHooks;

impl RemoteHooks for StandaloneHooks {
    fn kind(&self) -> HookHostKind {
        HookHostKind::Standalone
    }

    fn remote_method(&self, model: &str, name: &str, _spec: RemoteMethodSpec) {
        debug!("独立模式忽略远程方法: {}.{}", model, name);
    }

    fn before_remote(&self, model: &str, pattern: &str, _hook: RemoteHookFn) {
        debug!("独立模式忽略 beforeRemote: {}.{}", model, pattern);
    }

    fn after_remote(&self, model: &str, pattern: &str, _hook: RemoteHookFn) {
        debug!("独立模式忽略 afterRemote: {}.{}", model, pattern);
    }
}
