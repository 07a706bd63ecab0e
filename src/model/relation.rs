//! 模型关系
//!
//! 关系在模型绑定连接之后再定义，外键与中间模型的默认命名在定义时确定，
//! 访问时只需按已解析的定义查询目标模型。

use crate::error::{StandaloneError, StandaloneResult};
use crate::i18n::tf;
use crate::model::handle::ModelHandle;
use crate::types::{Filter, Record, RelationDefinition, RelationType};
use heck::ToLowerCamelCase;
use serde_json::Value;
use rat_logger::debug;

/// 关系查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedRecords {
    /// belongsTo / hasOne
    One(Option<Record>),
    /// hasMany / hasAndBelongsToMany
    Many(Vec<Record>),
}

impl RelatedRecords {
    /// 单条结果
    pub fn one(self) -> Option<Record> {
        match self {
            RelatedRecords::One(record) => record,
            RelatedRecords::Many(records) => records.into_iter().next(),
        }
    }

    /// 多条结果
    pub fn many(self) -> Vec<Record> {
        match self {
            RelatedRecords::One(record) => record.into_iter().collect(),
            RelatedRecords::Many(records) => records,
        }
    }
}

/// 指向某个模型的外键属性名，如 `UserProfile` -> `userProfileId`
pub fn model_key(model: &str) -> String {
    format!("{}Id", model.to_lower_camel_case())
}

/// 多对多关系的默认中间模型名：两个模型名排序后拼接
pub fn default_through(left: &str, right: &str) -> String {
    let mut names = [left, right];
    names.sort();
    format!("{}{}", names[0], names[1])
}

/// 补全关系定义中的默认外键与中间模型
pub fn resolve_relation(source: &str, name: &str, definition: &RelationDefinition) -> RelationDefinition {
    let mut resolved = definition.clone();
    if resolved.explicit_foreign_key().is_none() {
        let key = match definition.relation_type {
            RelationType::BelongsTo => format!("{}Id", name),
            RelationType::HasOne | RelationType::HasMany | RelationType::HasAndBelongsToMany => {
                model_key(source)
            }
        };
        resolved.foreign_key = Some(key);
    }
    if definition.relation_type == RelationType::HasAndBelongsToMany && resolved.through.is_none() {
        resolved.through = Some(default_through(source, &definition.model));
    }
    resolved
}

/// 关系访问器
#[derive(Debug, Clone)]
pub struct RelationAccessor {
    source: ModelHandle,
    name: String,
    definition: RelationDefinition,
}

impl RelationAccessor {
    pub(crate) fn new(source: ModelHandle, name: &str, definition: RelationDefinition) -> Self {
        Self {
            source,
            name: name.to_string(),
            definition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &RelationDefinition {
        &self.definition
    }

    pub fn relation_type(&self) -> RelationType {
        self.definition.relation_type
    }

    /// 目标模型名
    pub fn target(&self) -> &str {
        &self.definition.model
    }

    /// 外键属性名
    pub fn foreign_key(&self) -> String {
        resolve_relation(self.source.name(), &self.name, &self.definition)
            .foreign_key
            .unwrap_or_default()
    }

    fn lookup(&self, model: &str) -> StandaloneResult<ModelHandle> {
        self.source
            .connection()
            .and_then(|connection| connection.model(model))
            .ok_or_else(|| {
                crate::quick_error!(
                    query,
                    tf(
                        "error.relation_target_missing",
                        &[("relation", &self.name), ("target", &model.to_string())],
                    )
                )
            })
    }

    /// 取关联记录
    pub async fn get(&self, record: &Record) -> StandaloneResult<RelatedRecords> {
        let target = self.lookup(&self.definition.model)?;
        let foreign_key = self.foreign_key();
        debug!(
            "读取关系 {}.{} ({}) -> {}",
            self.source.name(),
            self.name,
            self.definition.relation_type.as_str(),
            self.definition.model
        );

        match self.definition.relation_type {
            RelationType::BelongsTo => {
                let key = record.get(&foreign_key).cloned().unwrap_or(Value::Null);
                if key.is_null() {
                    return Ok(RelatedRecords::One(None));
                }
                Ok(RelatedRecords::One(target.find_by_id(&key).await?))
            }
            RelationType::HasOne => {
                let Some(id) = self.source_id(record) else {
                    return Ok(RelatedRecords::One(None));
                };
                let filter = Filter::new().eq(&foreign_key, id);
                Ok(RelatedRecords::One(target.find_one(&filter).await?))
            }
            RelationType::HasMany => {
                let Some(id) = self.source_id(record) else {
                    return Ok(RelatedRecords::Many(Vec::new()));
                };
                let filter = Filter::new().eq(&foreign_key, id);
                Ok(RelatedRecords::Many(target.find(&filter).await?))
            }
            RelationType::HasAndBelongsToMany => {
                let Some(id) = self.source_id(record) else {
                    return Ok(RelatedRecords::Many(Vec::new()));
                };
                let through_name = self
                    .definition
                    .through
                    .clone()
                    .unwrap_or_else(|| default_through(self.source.name(), &self.definition.model));
                let through = self.lookup(&through_name)?;
                let target_key = model_key(&self.definition.model);

                let links = through.find(&Filter::new().eq(&foreign_key, id)).await?;
                let ids: Vec<Value> = links
                    .into_iter()
                    .filter_map(|mut link| link.remove(&target_key))
                    .filter(|v| !v.is_null())
                    .collect();
                if ids.is_empty() {
                    return Ok(RelatedRecords::Many(Vec::new()));
                }
                let filter = Filter::new().within(&target.id_property(), ids);
                Ok(RelatedRecords::Many(target.find(&filter).await?))
            }
        }
    }

    fn source_id(&self, record: &Record) -> Option<Value> {
        record
            .get(&self.source.id_property())
            .filter(|v| !v.is_null())
            .cloned()
    }
}

impl From<RelatedRecords> for Vec<Record> {
    fn from(records: RelatedRecords) -> Self {
        records.many()
    }
}

/// 校验关系目标是否已绑定到同一连接
pub(crate) fn ensure_target_attached(
    source: &ModelHandle,
    relation: &str,
    target: &str,
) -> StandaloneResult<()> {
    let attached = source
        .connection()
        .map(|connection| connection.model(target).is_some())
        .unwrap_or(false);
    if attached {
        Ok(())
    } else {
        Err(StandaloneError::SchemaError {
            model: source.name().to_string(),
            message: tf(
                "error.relation_target_missing",
                &[("relation", &relation.to_string()), ("target", &target.to_string())],
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        assert_eq!(model_key("UserProfile"), "userProfileId");
        assert_eq!(model_key("A"), "aId");
        assert_eq!(default_through("Tag", "Post"), "PostTag");

        let belongs = resolve_relation("B", "a", &RelationDefinition::belongs_to("A"));
        assert_eq!(belongs.foreign_key.as_deref(), Some("aId"));

        let many = resolve_relation("Author", "books", &RelationDefinition::has_many("Book"));
        assert_eq!(many.foreign_key.as_deref(), Some("authorId"));

        let habtm = resolve_relation("Post", "tags", &RelationDefinition::has_and_belongs_to_many("Tag"));
        assert_eq!(habtm.through.as_deref(), Some("PostTag"));
        assert_eq!(habtm.foreign_key.as_deref(), Some("postId"));

        let explicit = resolve_relation("B", "a", &RelationDefinition::belongs_to("A").foreign_key("owner"));
        assert_eq!(explicit.foreign_key.as_deref(), Some("owner"));
    }

    #[test]
    fn test_related_records_accessors() {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::from(1));
        assert_eq!(RelatedRecords::One(Some(record.clone())).many().len(), 1);
        assert_eq!(RelatedRecords::Many(vec![record.clone()]).one(), Some(record));
        assert!(RelatedRecords::One(None).one().is_none());
    }
}
