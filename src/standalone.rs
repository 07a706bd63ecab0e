//! 独立运行入口
//!
//! 按配置选择三种模式之一：同步组装（直接返回模型集合）、组装后同步表结构、
//! 逆向发现。三种模式互斥，同时启用 `sync` 与 `discovery` 时返回 `ConfigError`。
//! 每次调用都会创建独立的模型构建器、连接和模型集合，调用之间不共享状态。

use crate::config::{RunMode, StandaloneConfig};
use crate::connection::ConnectionHandle;
use crate::customize::load_customizations;
use crate::discovery::discover_models;
use crate::error::StandaloneResult;
use crate::loader::load_schemas;
use crate::mixin::{register_mixins, relocate};
use crate::model::{ModelBuilder, ModelCollection};
use crate::sync::{sync_models, SyncOutcome};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::fmt;
use rat_logger::{debug, info};

/// 待完成的表结构同步
pub type PendingSync = BoxFuture<'static, StandaloneResult<SyncOutcome>>;

/// 待完成的逆向发现
pub type PendingDiscovery = BoxFuture<'static, StandaloneResult<ModelCollection>>;

/// 运行结果，调用者按模式分支处理
pub enum Standalone {
    Models(ModelCollection),
    Sync(PendingSync),
    Discovery(PendingDiscovery),
}

impl Standalone {
    pub fn mode(&self) -> RunMode {
        match self {
            Standalone::Models(_) => RunMode::Assemble,
            Standalone::Sync(_) => RunMode::Sync,
            Standalone::Discovery(_) => RunMode::Discovery,
        }
    }

    /// 取出同步组装的结果
    pub fn into_models(self) -> Option<ModelCollection> {
        match self {
            Standalone::Models(models) => Some(models),
            _ => None,
        }
    }
}

impl fmt::Debug for Standalone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Standalone::Models(models) => f.debug_tuple("Standalone::Models").field(models).finish(),
            Standalone::Sync(_) => f.write_str("Standalone::Sync(<pending>)"),
            Standalone::Discovery(_) => f.write_str("Standalone::Discovery(<pending>)"),
        }
    }
}

/// 按配置运行
///
/// 同步组装模式下的错误直接返回；同步与逆向发现模式在返回前只做模式校验
/// （以及同步模式下的组装），其余错误由返回的 future 给出。
pub fn run(config: StandaloneConfig) -> StandaloneResult<Standalone> {
    match config.mode()? {
        RunMode::Assemble => Ok(Standalone::Models(assemble(&config)?)),
        RunMode::Sync => {
            let models = assemble(&config)?;
            Ok(Standalone::Sync(sync_models(models).boxed()))
        }
        RunMode::Discovery => Ok(Standalone::Discovery(
            async move { discover_with(&config).await }.boxed(),
        )),
    }
}

/// 组装模型：加载、注册混入、批量构建、绑定连接、定义关系、加载自定义逻辑
pub fn assemble(config: &StandaloneConfig) -> StandaloneResult<ModelCollection> {
    let schemas = match &config.schemas {
        Some(schemas) => schemas.clone(),
        None => {
            let path = config
                .models_path
                .as_ref()
                .ok_or_else(|| crate::quick_error!(config, crate::i18n::t("error.models_path_missing")))?;
            load_schemas(path)?
        }
    };

    let mut builder = ModelBuilder::new();
    let schemas = if config.mixins.is_empty() {
        schemas
    } else {
        register_mixins(&mut builder, &config.mixins);
        relocate(schemas)
    };

    let models = builder.build_models(&schemas)?;

    let connection = ConnectionHandle::open(&config.connector, &config.drivers, config.error_sink.clone())?;
    connection.attach_all(&models);

    for (name, model) in &models {
        let empty = BTreeMap::new();
        let relations = schemas
            .iter()
            .find(|descriptor| descriptor.name == *name)
            .map(|descriptor| &descriptor.relations)
            .unwrap_or(&empty);
        debug!("模型 {} 定义 {} 个关系", name, relations.len());
        builder.define_relations(model, relations)?;
    }

    load_customizations(&models, &config.customizations, config.models_path.as_deref())?;

    info!(
        "模型组装完成: 连接 {}，共 {} 个模型",
        connection.name(),
        models.len()
    );
    Ok(models)
}

/// 组装后同步表结构
pub async fn sync(config: StandaloneConfig) -> StandaloneResult<SyncOutcome> {
    let models = assemble(&config)?;
    sync_models(models).await
}

/// 逆向发现
pub async fn discover(config: StandaloneConfig) -> StandaloneResult<ModelCollection> {
    discover_with(&config).await
}

async fn discover_with(config: &StandaloneConfig) -> StandaloneResult<ModelCollection> {
    discover_models(
        &config.connector,
        &config.drivers,
        config.error_sink.clone(),
        &config.relations,
        &config.discovery_options,
    )
    .await
}
