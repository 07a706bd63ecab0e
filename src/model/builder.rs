//! 模型构建器
//!
//! 一次性接收整批模型描述并构建模型句柄。属性中对其他模型的引用
//! 只有在整批描述都可见时才能解析，因此不提供逐个构建的入口。

use crate::error::{StandaloneError, StandaloneResult};
use crate::i18n::tf;
use crate::mixin::{MixinFn, RESERVED_HOOK_MIXINS};
use crate::model::collection::ModelCollection;
use crate::model::definition::{IndexDefinition, ModelDefinition};
use crate::model::handle::ModelHandle;
use crate::model::relation::{ensure_target_attached, resolve_relation};
use crate::security::is_valid_identifier;
use crate::types::{
    PropertyDefinition, PropertyType, RelationDefinition, RelationType, SchemaDescriptor, BUILTIN_BASES,
    RESERVED_TYPE_NAMES,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use rat_logger::{debug, info};

/// 隐式主键属性名
pub const DEFAULT_ID_PROPERTY: &str = "id";

/// 模型构建器
#[derive(Default)]
pub struct ModelBuilder {
    mixins: BTreeMap<String, MixinFn>,
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("mixins", &self.mixins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册混入
    pub fn register_mixin(&mut self, name: &str, mixin: MixinFn) {
        self.mixins.insert(name.to_string(), mixin);
    }

    pub fn has_mixin(&self, name: &str) -> bool {
        self.mixins.contains_key(name)
    }

    /// 构建整批模型
    ///
    /// 校验顺序：模型名合法且不重复、`options.base` 已在之前出现或为内置基类、
    /// 属性类型可解析、引用的混入已注册。任何一项失败都返回 `SchemaError`，
    /// 此时不会产生任何模型。
    pub fn build_models(&self, descriptors: &[SchemaDescriptor]) -> StandaloneResult<ModelCollection> {
        let batch: BTreeSet<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        validate_batch(descriptors, &batch)?;

        let mut definitions: BTreeMap<String, ModelDefinition> = BTreeMap::new();
        let mut ordered = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            self.check_mixins(descriptor)?;
            let definition = resolve_definition(descriptor, &definitions, &batch)?;
            definitions.insert(descriptor.name.clone(), definition.clone());
            ordered.push(definition);
        }

        let mut collection = ModelCollection::new();
        for definition in ordered {
            let handle = ModelHandle::new(definition);
            self.apply_mixins(&handle)?;
            debug!("模型构建完成: {} (表: {})", handle.name(), handle.table());
            collection.insert(handle);
        }

        info!("批量构建模型完成，共 {} 个", collection.len());
        Ok(collection)
    }

    /// 在模型上定义关系
    ///
    /// 目标模型（以及多对多的中间模型）必须已绑定到同一个连接。
    pub fn define_relations(
        &self,
        model: &ModelHandle,
        relations: &BTreeMap<String, RelationDefinition>,
    ) -> StandaloneResult<()> {
        for (name, definition) in relations {
            let resolved = resolve_relation(model.name(), name, definition);
            ensure_target_attached(model, name, &resolved.model)?;
            if let Some(through) = &resolved.through {
                ensure_target_attached(model, name, through)?;
            }
            debug!(
                "定义关系 {}.{}: {} -> {}",
                model.name(),
                name,
                resolved.relation_type.as_str(),
                resolved.model
            );
            if resolved.relation_type == RelationType::BelongsTo {
                if let Some(key) = resolved.foreign_key.as_deref() {
                    define_foreign_key(model, key, &resolved.model);
                }
            }
            model.set_relation(name, resolved);
        }
        Ok(())
    }

    /// 引用的混入必须已注册
    ///
    /// 未经 `relocate` 的顶层声明同样检查，保留的钩子混入除外。
    fn check_mixins(&self, descriptor: &SchemaDescriptor) -> StandaloneResult<()> {
        let top_level = descriptor.mixins.iter().flat_map(|mixins| mixins.keys());
        for name in descriptor.options.mixins.keys().chain(top_level) {
            if RESERVED_HOOK_MIXINS.contains(&name.as_str()) {
                continue;
            }
            if !self.has_mixin(name) {
                return Err(StandaloneError::SchemaError {
                    model: descriptor.name.clone(),
                    message: tf("error.mixin_not_registered", &[("mixin", name)]),
                });
            }
        }
        Ok(())
    }

    fn apply_mixins(&self, handle: &ModelHandle) -> StandaloneResult<()> {
        let declared = handle.definition().settings.mixins;
        for (name, options) in declared {
            if options == Value::Bool(false) {
                continue;
            }
            let Some(mixin) = self.mixins.get(&name) else {
                continue;
            };
            mixin(handle, &options).map_err(|e| StandaloneError::SchemaError {
                model: handle.name().to_string(),
                message: tf("error.mixin_failed", &[("mixin", &name), ("message", &e.to_string())]),
            })?;
            handle.record_mixin(&name);
            debug!("模型 {} 应用混入: {}", handle.name(), name);
        }
        Ok(())
    }
}

/// `belongsTo` 的外键属性未声明时按目标主键类型补上
fn define_foreign_key(owner: &ModelHandle, key: &str, target: &str) {
    if owner.definition().properties.contains_key(key) {
        return;
    }
    let key_type = owner
        .connection()
        .and_then(|connection| connection.model(target))
        .and_then(|target| {
            let definition = target.definition();
            definition
                .properties
                .get(&definition.id_property)
                .map(|p| p.property_type.clone())
        })
        .unwrap_or(PropertyType::Number);
    owner.define_property(key, PropertyDefinition::new(key_type));
}

fn validate_batch(descriptors: &[SchemaDescriptor], batch: &BTreeSet<&str>) -> StandaloneResult<()> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for descriptor in descriptors {
        let name = descriptor.name.as_str();
        if !is_valid_identifier(name) {
            return Err(StandaloneError::SchemaError {
                model: name.to_string(),
                message: tf("error.invalid_model_name", &[("model", &descriptor.name)]),
            });
        }
        if RESERVED_TYPE_NAMES.contains(&name) {
            return Err(StandaloneError::SchemaError {
                model: name.to_string(),
                message: tf("error.reserved_type_name", &[("model", &descriptor.name)]),
            });
        }
        if seen.contains(name) {
            return Err(StandaloneError::SchemaError {
                model: name.to_string(),
                message: tf("error.duplicate_model", &[("model", &descriptor.name)]),
            });
        }

        if let Some(base) = descriptor.options.base.as_deref() {
            if !BUILTIN_BASES.contains(&base) && !seen.contains(base) {
                let key = if batch.contains(base) {
                    "error.base_out_of_order"
                } else {
                    "error.base_undefined"
                };
                return Err(StandaloneError::SchemaError {
                    model: name.to_string(),
                    message: tf(key, &[("base", &base.to_string()), ("model", &descriptor.name)]),
                });
            }
        }
        seen.insert(name);
    }
    Ok(())
}

fn check_type(model: &str, property: &str, property_type: &PropertyType, batch: &BTreeSet<&str>) -> StandaloneResult<()> {
    if let Some(referenced) = property_type.referenced_model() {
        if !batch.contains(referenced) {
            return Err(StandaloneError::SchemaError {
                model: model.to_string(),
                message: tf(
                    "error.unknown_type",
                    &[("property", &property.to_string()), ("type", &property_type.name())],
                ),
            });
        }
    }
    Ok(())
}

fn resolve_definition(
    descriptor: &SchemaDescriptor,
    resolved: &BTreeMap<String, ModelDefinition>,
    batch: &BTreeSet<&str>,
) -> StandaloneResult<ModelDefinition> {
    let name = descriptor.name.as_str();
    let base = descriptor.options.base.clone();

    let mut properties: BTreeMap<String, PropertyDefinition> = base
        .as_deref()
        .and_then(|b| resolved.get(b))
        .map(|parent| parent.properties.clone())
        .unwrap_or_default();

    for (property, definition) in &descriptor.properties {
        check_type(name, property, &definition.property_type, batch)?;
        properties.insert(property.clone(), definition.clone());
    }

    let explicit_id = properties
        .iter()
        .find(|(_, p)| p.id)
        .map(|(n, _)| n.clone())
        .or_else(|| properties.contains_key(DEFAULT_ID_PROPERTY).then(|| DEFAULT_ID_PROPERTY.to_string()));

    let (id_property, id_generated) = match explicit_id {
        Some(id) => {
            let mut generated = false;
            if let Some(property) = properties.get_mut(&id) {
                property.id = true;
                generated = matches!(property.property_type, PropertyType::Number | PropertyType::Any)
                    && property.default.is_none()
                    && property.default_fn.is_none();
                if !generated {
                    property.required = true;
                }
            }
            (id, generated)
        }
        None => {
            properties.insert(
                DEFAULT_ID_PROPERTY.to_string(),
                PropertyDefinition::new(PropertyType::Number).id(),
            );
            (DEFAULT_ID_PROPERTY.to_string(), true)
        }
    };

    let mut indexes = Vec::new();
    for (index_name, value) in &descriptor.options.indexes {
        let index = IndexDefinition::from_value(name, index_name, value)?;
        if let Some(missing) = index.properties.iter().find(|p| !properties.contains_key(*p)) {
            return Err(crate::quick_error!(
                schema,
                name,
                format!("索引 '{}' 引用了未定义的属性 '{}'", index_name, missing)
            ));
        }
        indexes.push(index);
    }
    let table = descriptor
        .options
        .table
        .clone()
        .unwrap_or_else(|| descriptor.name.clone());
    for (property, definition) in &properties {
        if definition.index && property != &id_property {
            indexes.push(IndexDefinition {
                name: format!("{}_{}_idx", table, property),
                properties: vec![property.clone()],
                unique: false,
            });
        }
    }

    Ok(ModelDefinition {
        name: descriptor.name.clone(),
        table,
        base,
        properties,
        id_property,
        id_generated,
        indexes,
        settings: descriptor.options.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn number() -> PropertyDefinition {
        PropertyDefinition::new(PropertyType::Number)
    }

    #[test]
    fn test_build_batch_with_cross_references() {
        let descriptors = vec![
            SchemaDescriptor::new("Note")
                .property("title", PropertyDefinition::new(PropertyType::String))
                .property("author", PropertyDefinition::new(PropertyType::Model("Author".to_string()))),
            SchemaDescriptor::new("Author").property("id", number()),
        ];

        let models = ModelBuilder::new().build_models(&descriptors).unwrap();
        assert_eq!(models.names(), vec!["Author".to_string(), "Note".to_string()]);

        let note = models["Note"].definition();
        assert_eq!(note.id_property, "id");
        assert!(note.id_generated);
        assert_eq!(note.table, "Note");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let descriptors = vec![SchemaDescriptor::new("Note")
            .property("author", PropertyDefinition::new(PropertyType::Model("Ghost".to_string())))];
        let result = ModelBuilder::new().build_models(&descriptors);
        assert!(matches!(result, Err(StandaloneError::SchemaError { ref model, .. }) if model == "Note"));
    }

    #[test]
    fn test_base_ordering() {
        let base_first = vec![
            SchemaDescriptor::new("Base").property("createdAt", PropertyDefinition::new(PropertyType::Date)),
            SchemaDescriptor::new("Child").base("Base").property("title", PropertyDefinition::new(PropertyType::String)),
        ];
        let models = ModelBuilder::new().build_models(&base_first).unwrap();
        let child = models["Child"].definition();
        assert!(child.properties.contains_key("createdAt"));
        assert_eq!(child.base.as_deref(), Some("Base"));

        let reversed: Vec<_> = base_first.into_iter().rev().collect();
        assert!(matches!(
            ModelBuilder::new().build_models(&reversed),
            Err(StandaloneError::SchemaError { .. })
        ));

        let undefined = vec![SchemaDescriptor::new("Child").base("Missing")];
        assert!(ModelBuilder::new().build_models(&undefined).is_err());

        let builtin = vec![SchemaDescriptor::new("Child").base("PersistedModel")];
        assert!(ModelBuilder::new().build_models(&builtin).is_ok());
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let duplicate = vec![SchemaDescriptor::new("A"), SchemaDescriptor::new("A")];
        assert!(ModelBuilder::new().build_models(&duplicate).is_err());

        let invalid = vec![SchemaDescriptor::new("user-profile")];
        assert!(ModelBuilder::new().build_models(&invalid).is_err());
    }

    #[test]
    fn test_builtin_type_name_reserved() {
        let reserved = vec![SchemaDescriptor::new("Date")];
        assert!(matches!(
            ModelBuilder::new().build_models(&reserved),
            Err(StandaloneError::SchemaError { ref model, .. }) if model == "Date"
        ));

        let descriptors = vec![
            SchemaDescriptor::new("Json").property("raw", PropertyDefinition::new(PropertyType::String)),
            SchemaDescriptor::new("Note").property("payload", PropertyDefinition::new(PropertyType::from_name("Json"))),
        ];
        let models = ModelBuilder::new().build_models(&descriptors).unwrap();
        assert_eq!(
            models["Note"].definition().properties["payload"].property_type,
            PropertyType::Model("Json".to_string())
        );
    }

    #[test]
    fn test_top_level_mixin_checked_without_relocation() {
        let descriptor = SchemaDescriptor::new("Note").mixin("SoftDelete", json!(true));
        match ModelBuilder::new().build_models(&[descriptor]) {
            Err(StandaloneError::SchemaError { model, message }) => {
                assert_eq!(model, "Note");
                assert!(message.contains("SoftDelete"));
            }
            other => panic!("unexpected result: {:?}", other.map(|m| m.names())),
        }

        let reserved = SchemaDescriptor::new("Note").mixin("RemoteRouting", json!({"disable": ["find"]}));
        assert!(ModelBuilder::new().build_models(&[reserved]).is_ok());
    }

    #[test]
    fn test_mixins_checked_and_applied() {
        let mut descriptor = SchemaDescriptor::new("Note");
        descriptor.options.mixins.insert("Timestamp".to_string(), json!({"field": "createdAt"}));

        assert!(matches!(
            ModelBuilder::new().build_models(&[descriptor.clone()]),
            Err(StandaloneError::SchemaError { .. })
        ));

        let mut builder = ModelBuilder::new();
        builder.register_mixin(
            "Timestamp",
            Arc::new(|model: &ModelHandle, options: &Value| {
                let field = options["field"].as_str().unwrap_or("createdAt");
                model.define_property(field, PropertyDefinition::new(PropertyType::Date));
                Ok(())
            }),
        );
        let models = builder.build_models(&[descriptor]).unwrap();
        let note = &models["Note"];
        assert_eq!(note.mixins(), vec!["Timestamp".to_string()]);
        assert!(note.definition().properties.contains_key("createdAt"));
    }

    #[test]
    fn test_explicit_string_id_and_indexes() {
        let descriptor = SchemaDescriptor::new("Session")
            .table("sessions")
            .property("token", PropertyDefinition::new(PropertyType::String).id())
            .property("userId", number().indexed())
            .index("token_idx", json!({"keys": {"token": 1}, "options": {"unique": true}}));

        let models = ModelBuilder::new().build_models(&[descriptor]).unwrap();
        let session = models["Session"].definition();
        assert_eq!(session.id_property, "token");
        assert!(!session.id_generated);
        assert!(session.properties["token"].required);
        assert_eq!(session.table, "sessions");
        assert_eq!(session.indexes.len(), 2);
        assert!(session.indexes.iter().any(|i| i.name == "sessions_userId_idx"));
    }
}
