//! 逆向发现
//!
//! 从现有数据库的元数据反推模型：列出表，按表并发发现并构建模型，
//! 合并结果，最后应用调用者提供的关系覆盖提示。

pub mod schema;

use crate::adapter::ConnectorRegistry;
use crate::connection::{ConnectionHandle, ErrorSink};
use crate::error::StandaloneResult;
use crate::i18n::tf;
use crate::model::{ModelBuilder, ModelCollection};
use crate::types::{ConnectorProfile, DiscoveryOptions, RelationDefinition, RelationHint};
use futures::future::try_join_all;
use self::schema::model_name_for_table;
use std::collections::BTreeMap;
use rat_logger::{debug, info, warn};

/// 合并后的提示：模型名 -> 关系名 -> 关系定义
pub type MergedHints = BTreeMap<String, BTreeMap<String, RelationDefinition>>;

/// 按模型名合并提示
///
/// 合并结果与提示顺序无关；同一模型的同名关系在两个提示中定义不同时返回 `ConfigError`。
pub fn merge_hints(hints: &[RelationHint]) -> StandaloneResult<MergedHints> {
    let mut merged: MergedHints = BTreeMap::new();
    for hint in hints {
        let relations = merged.entry(hint.name.clone()).or_default();
        for (name, definition) in &hint.relations {
            match relations.get(name) {
                Some(existing) if existing != definition => {
                    return Err(crate::quick_error!(
                        config,
                        tf(
                            "error.hint_conflict",
                            &[("model", &hint.name), ("relation", name)],
                        )
                    ));
                }
                Some(_) => {}
                None => {
                    relations.insert(name.clone(), definition.clone());
                }
            }
        }
    }
    Ok(merged)
}

/// 打开连接并发现模型
pub async fn discover_models(
    profile: &ConnectorProfile,
    drivers: &ConnectorRegistry,
    sink: ErrorSink,
    hints: &[RelationHint],
    options: &DiscoveryOptions,
) -> StandaloneResult<ModelCollection> {
    let connection = ConnectionHandle::open(profile, drivers, sink)?;
    discover_on(&connection, hints, options).await
}

/// 在已有连接上发现模型
pub async fn discover_on(
    connection: &ConnectionHandle,
    hints: &[RelationHint],
    options: &DiscoveryOptions,
) -> StandaloneResult<ModelCollection> {
    let merged_hints = merge_hints(hints)?;

    let tables = connection.discover_model_definitions(options).await?;
    info!("连接 {} 发现 {} 张表", connection.name(), tables.len());

    // 任意一张表失败时，其余尚未完成的请求随 try_join_all 一起被丢弃
    let discovered = try_join_all(
        tables
            .iter()
            .map(|table| connection.discover_and_build_models(&table.name, options)),
    )
    .await?;

    // 每张表以自己批次中的模型为准，外键目标的副本只补缺
    let mut models = ModelCollection::new();
    let mut primaries = Vec::with_capacity(tables.len());
    for (table, batch) in tables.iter().zip(discovered) {
        let primary = model_name_for_table(&table.name);
        for (name, model) in batch {
            if name == primary {
                primaries.push(model);
            } else if !models.contains(&name) {
                models.insert(model);
            }
        }
    }
    for model in primaries {
        models.insert(model);
    }
    connection.attach_all(&models);

    let builder = ModelBuilder::new();
    for (name, relations) in &merged_hints {
        match models.get(name) {
            Some(model) => {
                debug!("应用关系提示: {} ({} 个关系)", name, relations.len());
                builder.define_relations(model, relations)?;
            }
            None => warn!("关系提示 {} 没有匹配的已发现模型，已忽略", name),
        }
    }

    info!("逆向发现完成，共 {} 个模型", models.len());
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StandaloneError;

    #[test]
    fn test_merge_hints_is_order_independent() {
        let first = RelationHint::new("State")
            .relation("config", RelationDefinition::belongs_to("Config").foreign_key("configId"));
        let second = RelationHint::new("State").relation("owner", RelationDefinition::belongs_to("User"));

        let forward = merge_hints(&[first.clone(), second.clone()]).unwrap();
        let backward = merge_hints(&[second, first]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward["State"].len(), 2);
    }

    #[test]
    fn test_conflicting_hints_rejected() {
        let a = RelationHint::new("State").relation("config", RelationDefinition::belongs_to("Config"));
        let b = RelationHint::new("State").relation("config", RelationDefinition::has_one("Config"));
        assert!(matches!(merge_hints(&[a, b]), Err(StandaloneError::ConfigError { .. })));
    }
}
